//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::{Duration, NaiveDateTime, Utc};
use marquee::orm::{movie_petitions, movies, petition_votes, reviews, users};
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Create a regular test user
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        name: Set(name.to_string()),
        is_admin: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a test user carrying the stored admin flag
pub async fn create_test_admin(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        name: Set(name.to_string()),
        is_admin: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_movie(db: &DatabaseConnection, name: &str) -> Result<movies::Model, DbErr> {
    movies::ActiveModel {
        name: Set(name.to_string()),
        price: Set(1200),
        description: Set(format!("{} is a movie.", name)),
        image: Set(String::new()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create an active review, `minutes_ago` minutes in the past
pub async fn create_test_review(
    db: &DatabaseConnection,
    movie_id: i32,
    user_id: i32,
    comment: &str,
    minutes_ago: i64,
) -> Result<reviews::Model, DbErr> {
    reviews::ActiveModel {
        comment: Set(comment.to_string()),
        created_at: Set(Utc::now().naive_utc() - Duration::minutes(minutes_ago)),
        movie_id: Set(movie_id),
        user_id: Set(user_id),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create an active petition with an explicit creation time
pub async fn create_test_petition(
    db: &DatabaseConnection,
    petitioner_id: i32,
    title: &str,
    created_at: NaiveDateTime,
) -> Result<movie_petitions::Model, DbErr> {
    movie_petitions::ActiveModel {
        title: Set(title.to_string()),
        description: Set(format!("Please add {}", title)),
        petitioner_id: Set(petitioner_id),
        created_at: Set(created_at),
        is_active: Set(true),
        admin_reviewed: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// All stored votes on a petition
pub async fn get_votes(
    db: &DatabaseConnection,
    petition_id: i32,
) -> Result<Vec<petition_votes::Model>, DbErr> {
    petition_votes::Entity::find()
        .filter(petition_votes::Column::PetitionId.eq(petition_id))
        .all(db)
        .await
}

pub async fn get_review(db: &DatabaseConnection, review_id: i32) -> Result<reviews::Model, DbErr> {
    reviews::Entity::find_by_id(review_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("review {}", review_id)))
}
