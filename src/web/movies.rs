//! Catalog browsing endpoints

use crate::movies::{self, MovieView};
use actix_web::{get, web, Error, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_movies).service(view_movie);
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[get("/movies")]
pub async fn list_movies(
    db: web::Data<DatabaseConnection>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    let movies: Vec<MovieView> = movies::list_movies(db.get_ref(), query.search.as_deref())
        .await
        .map_err(crate::error::ServiceError::from)?
        .into_iter()
        .map(MovieView::from)
        .collect();

    Ok(HttpResponse::Ok().json(movies))
}

#[get("/movies/{movie_id}")]
pub async fn view_movie(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let detail = movies::show_movie(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}
