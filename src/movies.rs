//! Movie catalog: listing, search and the admin-managed entries themselves.

use crate::error::{not_blank, ServiceError};
use crate::orm::{movies, reports, reviews};
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection, DbErr};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A review as shown under its movie.
#[derive(Clone, Debug, Serialize)]
pub struct ReviewView {
    pub id: i32,
    pub comment: String,
    pub created_at: chrono::NaiveDateTime,
    pub user_id: i32,
    pub user_name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieView {
    pub id: i32,
    pub name: String,
    pub price: i32,
    pub description: String,
    pub image: String,
}

impl From<movies::Model> for MovieView {
    fn from(m: movies::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            price: m.price,
            description: m.description,
            image: m.image,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieDetail {
    pub movie: MovieView,
    pub reviews: Vec<ReviewView>,
}

/// Admin input for a new catalog entry.
#[derive(Debug, Deserialize, Validate)]
pub struct NewMovie {
    #[validate(
        custom = "not_blank",
        length(max = 255, message = "must be at most 255 characters")
    )]
    pub name: String,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub price: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub image: String,
}

/// Escapes `term` for a `LIKE ... ESCAPE '!'` pattern so `%` and `_` match
/// themselves.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

/// Lists movies by name, optionally keeping only names containing `search`
/// (case-insensitive).
pub async fn list_movies(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<movies::Model>, DbErr> {
    let mut query = movies::Entity::find().order_by_asc(movies::Column::Name);

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(Expr::cust_with_values(
            "LOWER(\"movies\".\"name\") LIKE ? ESCAPE '!'",
            vec![format!("%{}%", escape_like(&term.to_lowercase()))],
        ));
    }

    query.all(db).await
}

pub async fn get_movie(db: &DatabaseConnection, movie_id: i32) -> Result<movies::Model, ServiceError> {
    movies::Entity::find_by_id(movie_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Movie"))
}

/// Loads a movie with its visible reviews, newest first.
pub async fn show_movie(db: &DatabaseConnection, movie_id: i32) -> Result<MovieDetail, ServiceError> {
    let movie = get_movie(db, movie_id).await?;

    let active_reviews = reviews::Entity::find()
        .filter(reviews::Column::MovieId.eq(movie_id))
        .filter(reviews::Column::IsActive.eq(true))
        .order_by_desc(reviews::Column::CreatedAt)
        .order_by_desc(reviews::Column::Id)
        .all(db)
        .await?;

    let names = crate::user::get_names(db, active_reviews.iter().map(|r| r.user_id)).await?;

    let reviews = active_reviews
        .into_iter()
        .map(|r| ReviewView {
            user_name: names
                .get(&r.user_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            id: r.id,
            comment: r.comment,
            created_at: r.created_at,
            user_id: r.user_id,
        })
        .collect();

    Ok(MovieDetail {
        movie: movie.into(),
        reviews,
    })
}

pub async fn create_movie(
    db: &DatabaseConnection,
    input: &NewMovie,
) -> Result<movies::Model, ServiceError> {
    input.validate()?;

    let movie = movies::ActiveModel {
        name: Set(input.name.trim().to_string()),
        price: Set(input.price),
        description: Set(input.description.clone()),
        image: Set(input.image.trim().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!("Movie {} created: {}", movie.id, movie.name);
    Ok(movie)
}

/// Deletes a movie together with its reviews and their reports.
pub async fn delete_movie(db: &DatabaseConnection, movie_id: i32) -> Result<(), ServiceError> {
    let txn = db.begin().await?;

    let review_ids: Vec<i32> = reviews::Entity::find()
        .filter(reviews::Column::MovieId.eq(movie_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    if !review_ids.is_empty() {
        reports::Entity::delete_many()
            .filter(reports::Column::ReviewId.is_in(review_ids))
            .exec(&txn)
            .await?;
        reviews::Entity::delete_many()
            .filter(reviews::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;
    }

    let result = movies::Entity::delete_by_id(movie_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(ServiceError::NotFound("Movie"));
    }

    txn.commit().await?;
    log::info!("Movie {} deleted", movie_id);
    Ok(())
}
