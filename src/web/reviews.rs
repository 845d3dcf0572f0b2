//! Review posting, editing and reporting endpoints

use crate::middleware::ClientCtx;
use crate::orm::reviews as review_rows;
use crate::reviews::{self, ReportInput, ReviewInput};
use actix_web::{get, post, web, Error, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_review)
        .service(view_review_for_edit)
        .service(edit_review)
        .service(delete_review)
        .service(report_review);
}

/// A review as returned to its author.
#[derive(Serialize)]
struct OwnReview {
    id: i32,
    movie_id: i32,
    comment: String,
    created_at: chrono::NaiveDateTime,
    is_active: bool,
}

impl From<review_rows::Model> for OwnReview {
    fn from(r: review_rows::Model) -> Self {
        Self {
            id: r.id,
            movie_id: r.movie_id,
            comment: r.comment,
            created_at: r.created_at,
            is_active: r.is_active,
        }
    }
}

#[post("/movies/{movie_id}/reviews")]
pub async fn create_review(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<ReviewInput>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let review = reviews::create_review(db.get_ref(), path.into_inner(), user_id, &form).await?;
    Ok(HttpResponse::Created().json(OwnReview::from(review)))
}

#[get("/movies/{movie_id}/reviews/{review_id}")]
pub async fn view_review_for_edit(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let (movie_id, review_id) = path.into_inner();
    let review = reviews::get_review_for_edit(db.get_ref(), movie_id, review_id, user_id).await?;
    Ok(HttpResponse::Ok().json(OwnReview::from(review)))
}

#[post("/movies/{movie_id}/reviews/{review_id}/edit")]
pub async fn edit_review(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Form<ReviewInput>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let (movie_id, review_id) = path.into_inner();
    let review = reviews::edit_review(db.get_ref(), movie_id, review_id, user_id, &form).await?;
    Ok(HttpResponse::Ok().json(OwnReview::from(review)))
}

#[post("/movies/{movie_id}/reviews/{review_id}/delete")]
pub async fn delete_review(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let (movie_id, review_id) = path.into_inner();
    reviews::delete_review(db.get_ref(), movie_id, review_id, user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": review_id })))
}

/// Reporting a review hides it at once. Repeats are answered with the
/// reason nothing changed rather than an error.
#[post("/movies/{movie_id}/reviews/{review_id}/report")]
pub async fn report_review(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: Option<web::Form<ReportInput>>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let (movie_id, review_id) = path.into_inner();
    let input = form.map(web::Form::into_inner).unwrap_or_default();

    let status = reviews::report_review(db.get_ref(), movie_id, review_id, user_id, &input).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": status })))
}
