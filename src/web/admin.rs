//! Moderation endpoints. Every route requires admin rights.

use crate::constants::MAX_BULK_IDS;
use crate::error::ServiceError;
use crate::middleware::ClientCtx;
use crate::movies::{self, MovieView, NewMovie};
use crate::petitions;
use crate::reviews::{self, ReportView};
use actix_web::{get, post, web, Error, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_reviews)
        .service(hide_reviews)
        .service(reinstate_reviews)
        .service(view_reports)
        .service(resolve_reports)
        .service(view_petitions)
        .service(mark_petitions_reviewed)
        .service(activate_petitions)
        .service(deactivate_petitions)
        .service(create_movie)
        .service(delete_movie);
}

/// Bulk action body: `ids=1,2,3`.
#[derive(Deserialize)]
pub struct IdsForm {
    #[serde(default)]
    pub ids: String,
}

impl IdsForm {
    pub fn parse(&self) -> Result<Vec<i32>, ServiceError> {
        parse_ids(&self.ids)
    }
}

/// Parses a comma separated id list. Blank entries are skipped and repeats
/// collapsed; anything else that is not an id rejects the whole list.
pub fn parse_ids(raw: &str) -> Result<Vec<i32>, ServiceError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<i32>()
            .map_err(|_| ServiceError::Validation(format!("Invalid id '{}'", part)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(ServiceError::Validation("No ids selected".to_string()));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(ServiceError::Validation(format!(
            "At most {} ids may be changed at once",
            MAX_BULK_IDS
        )));
    }
    Ok(ids)
}

#[derive(Serialize)]
struct Affected {
    affected: u64,
}

fn affected(count: u64) -> HttpResponse {
    HttpResponse::Ok().json(Affected { affected: count })
}

// ============ Reviews ============

#[derive(Deserialize)]
pub struct ActiveFilter {
    pub active: Option<bool>,
}

#[get("/admin/reviews")]
async fn view_reviews(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ActiveFilter>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let rows = reviews::list_for_moderation(db.get_ref(), query.active)
        .await
        .map_err(ServiceError::from)?;
    Ok(HttpResponse::Ok().json(rows))
}

#[post("/admin/reviews/hide")]
async fn hide_reviews(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<IdsForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let ids = form.parse()?;
    let count = reviews::set_reviews_active(db.get_ref(), &ids, false)
        .await
        .map_err(ServiceError::from)?;
    log::info!("Admin {} hid reviews {:?}", client.get_name(), ids);
    Ok(affected(count))
}

#[post("/admin/reviews/reinstate")]
async fn reinstate_reviews(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<IdsForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let ids = form.parse()?;
    let count = reviews::set_reviews_active(db.get_ref(), &ids, true)
        .await
        .map_err(ServiceError::from)?;
    log::info!("Admin {} reinstated reviews {:?}", client.get_name(), ids);
    Ok(affected(count))
}

// ============ Reports ============

#[derive(Deserialize)]
pub struct ResolvedFilter {
    pub resolved: Option<bool>,
}

#[get("/admin/reports")]
async fn view_reports(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ResolvedFilter>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let reports: Vec<ReportView> = reviews::list_reports(db.get_ref(), query.resolved)
        .await
        .map_err(ServiceError::from)?
        .into_iter()
        .map(ReportView::from)
        .collect();
    Ok(HttpResponse::Ok().json(reports))
}

#[post("/admin/reports/resolve")]
async fn resolve_reports(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<IdsForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let ids = form.parse()?;
    let count = reviews::resolve_reports(db.get_ref(), &ids)
        .await
        .map_err(ServiceError::from)?;
    log::info!("Admin {} resolved reports {:?}", client.get_name(), ids);
    Ok(affected(count))
}

// ============ Petitions ============

#[get("/admin/petitions")]
async fn view_petitions(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let petitions = petitions::list_all(db.get_ref())
        .await
        .map_err(ServiceError::from)?;
    Ok(HttpResponse::Ok().json(petitions))
}

#[post("/admin/petitions/mark-reviewed")]
async fn mark_petitions_reviewed(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<IdsForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let ids = form.parse()?;
    let count = petitions::mark_reviewed(db.get_ref(), &ids)
        .await
        .map_err(ServiceError::from)?;
    log::info!("Admin {} reviewed petitions {:?}", client.get_name(), ids);
    Ok(affected(count))
}

#[post("/admin/petitions/activate")]
async fn activate_petitions(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<IdsForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let ids = form.parse()?;
    let count = petitions::set_petitions_active(db.get_ref(), &ids, true)
        .await
        .map_err(ServiceError::from)?;
    log::info!("Admin {} activated petitions {:?}", client.get_name(), ids);
    Ok(affected(count))
}

#[post("/admin/petitions/deactivate")]
async fn deactivate_petitions(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<IdsForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let ids = form.parse()?;
    let count = petitions::set_petitions_active(db.get_ref(), &ids, false)
        .await
        .map_err(ServiceError::from)?;
    log::info!("Admin {} deactivated petitions {:?}", client.get_name(), ids);
    Ok(affected(count))
}

// ============ Movies ============

#[post("/admin/movies")]
async fn create_movie(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<NewMovie>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let movie = movies::create_movie(db.get_ref(), &form).await?;
    Ok(HttpResponse::Created().json(MovieView::from(movie)))
}

#[post("/admin/movies/{movie_id}/delete")]
async fn delete_movie(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    let movie_id = path.into_inner();
    movies::delete_movie(db.get_ref(), movie_id).await?;
    log::info!("Admin {} deleted movie {}", client.get_name(), movie_id);
    Ok(HttpResponse::Ok().json(json!({ "deleted": movie_id })))
}
