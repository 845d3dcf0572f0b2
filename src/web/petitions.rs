//! Movie petition endpoints

use crate::error::ServiceError;
use crate::middleware::ClientCtx;
use crate::petitions::{self, PetitionCreation, PetitionInput, VoteDirection};
use actix_web::{get, post, web, Error, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_petitions)
        .service(create_petition)
        .service(view_petition)
        .service(vote_on_petition);
}

#[get("/petitions")]
pub async fn list_petitions(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, Error> {
    let petitions = petitions::list_active(db.get_ref())
        .await
        .map_err(ServiceError::from)?;
    Ok(HttpResponse::Ok().json(petitions))
}

#[derive(Serialize)]
struct CreatedPetition {
    id: i32,
    title: String,
    description: String,
    created_at: chrono::NaiveDateTime,
}

/// Returned with 409 so the client can refill its form.
#[derive(Serialize)]
struct DuplicatePetition<'a> {
    error: String,
    existing_petition_id: i32,
    title: &'a str,
    description: &'a str,
}

#[post("/petitions")]
pub async fn create_petition(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<PetitionInput>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;

    match petitions::create_petition(db.get_ref(), user_id, &form).await? {
        PetitionCreation::Created(petition) => Ok(HttpResponse::Created().json(CreatedPetition {
            id: petition.id,
            title: petition.title,
            description: petition.description,
            created_at: petition.created_at,
        })),
        PetitionCreation::Duplicate(existing) => {
            Ok(HttpResponse::Conflict().json(DuplicatePetition {
                error: format!(
                    "You already have an active petition for \"{}\"",
                    existing.title
                ),
                existing_petition_id: existing.id,
                title: &form.title,
                description: &form.description,
            }))
        }
    }
}

#[get("/petitions/{petition_id}")]
pub async fn view_petition(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let detail = petitions::show_petition(db.get_ref(), path.into_inner(), client.get_id()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[derive(Deserialize)]
pub struct VoteForm {
    pub vote_type: String,
}

#[post("/petitions/{petition_id}/vote")]
pub async fn vote_on_petition(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<VoteForm>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let direction: VoteDirection = form.vote_type.parse().map_err(ServiceError::Validation)?;

    let outcome =
        petitions::cast_vote(db.get_ref(), path.into_inner(), user_id, direction).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
