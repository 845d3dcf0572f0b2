//! Petitions for movies the catalog is missing, and the votes on them.

pub mod vote;

use crate::error::{not_blank, ServiceError};
use crate::orm::{movie_petitions, petition_votes};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, DatabaseConnection, DatabaseTransaction, DbErr,
    FromQueryResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;
pub use vote::{transition, VoteAction, VoteDirection, VoteState, VoteTally};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PetitionInput {
    #[validate(
        custom = "not_blank",
        length(max = 255, message = "must be at most 255 characters")
    )]
    pub title: String,
    #[validate(custom = "not_blank")]
    pub description: String,
}

/// Result of submitting a petition.
#[derive(Debug)]
pub enum PetitionCreation {
    Created(movie_petitions::Model),
    /// The petitioner already has an active petition covering this title.
    Duplicate(movie_petitions::Model),
}

#[derive(Clone, Debug, Serialize)]
pub struct PetitionView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub petitioner_id: i32,
    pub petitioner_name: String,
    pub created_at: chrono::NaiveDateTime,
    pub is_active: bool,
    pub admin_reviewed: bool,
    pub upvotes: i64,
    pub downvotes: i64,
    pub net_votes: i64,
}

impl PetitionView {
    fn new(petition: movie_petitions::Model, petitioner_name: String, tally: VoteTally) -> Self {
        Self {
            id: petition.id,
            title: petition.title,
            description: petition.description,
            petitioner_id: petition.petitioner_id,
            petitioner_name,
            created_at: petition.created_at,
            is_active: petition.is_active,
            admin_reviewed: petition.admin_reviewed,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            net_votes: tally.net(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PetitionDetail {
    pub petition: PetitionView,
    pub user_vote: VoteState,
}

/// Result of casting a vote, with tallies read in the same transaction.
#[derive(Clone, Debug, Serialize)]
pub struct VoteOutcome {
    pub action: VoteAction,
    pub user_vote: VoteState,
    pub upvotes: i64,
    pub downvotes: i64,
    pub net_votes: i64,
}

/// Loose duplicate heuristic: the existing title contains the new one,
/// ignoring case.
pub fn is_soft_duplicate(existing_title: &str, new_title: &str) -> bool {
    existing_title
        .to_lowercase()
        .contains(&new_title.trim().to_lowercase())
}

/// Orders petitions by net votes, most first; ties go to the newest.
pub fn sort_by_score(petitions: &mut [PetitionView]) {
    petitions.sort_by(|a, b| {
        b.net_votes
            .cmp(&a.net_votes)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub async fn get_petition<C>(db: &C, petition_id: i32) -> Result<movie_petitions::Model, ServiceError>
where
    C: ConnectionTrait,
{
    movie_petitions::Entity::find_by_id(petition_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Petition"))
}

/// Submits a petition unless the user already has an active one whose title
/// covers the new title.
pub async fn create_petition(
    db: &DatabaseConnection,
    user_id: i32,
    input: &PetitionInput,
) -> Result<PetitionCreation, ServiceError> {
    input.validate()?;
    let title = input.title.trim();

    let existing = movie_petitions::Entity::find()
        .filter(movie_petitions::Column::PetitionerId.eq(user_id))
        .filter(movie_petitions::Column::IsActive.eq(true))
        .order_by_asc(movie_petitions::Column::Id)
        .all(db)
        .await?;

    if let Some(duplicate) = existing
        .into_iter()
        .find(|p| is_soft_duplicate(&p.title, title))
    {
        log::debug!(
            "User {} petition '{}' rejected as duplicate of petition {}",
            user_id,
            title,
            duplicate.id
        );
        return Ok(PetitionCreation::Duplicate(duplicate));
    }

    let petition = movie_petitions::ActiveModel {
        title: Set(title.to_string()),
        description: Set(input.description.trim().to_string()),
        petitioner_id: Set(user_id),
        created_at: Set(Utc::now().naive_utc()),
        is_active: Set(true),
        admin_reviewed: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!("Petition {} created by user {}", petition.id, user_id);
    Ok(PetitionCreation::Created(petition))
}

#[derive(Debug, FromQueryResult)]
struct VoteCountRow {
    petition_id: i32,
    vote_type: bool,
    count: i64,
}

/// Counts up and down votes for each listed petition. Petitions without votes
/// are absent from the map.
pub async fn tallies<C>(db: &C, petition_ids: &[i32]) -> Result<HashMap<i32, VoteTally>, DbErr>
where
    C: ConnectionTrait,
{
    if petition_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = petition_votes::Entity::find()
        .select_only()
        .column(petition_votes::Column::PetitionId)
        .column(petition_votes::Column::VoteType)
        .column_as(Expr::col(petition_votes::Column::Id).count(), "count")
        .filter(petition_votes::Column::PetitionId.is_in(petition_ids.to_vec()))
        .group_by(petition_votes::Column::PetitionId)
        .group_by(petition_votes::Column::VoteType)
        .into_model::<VoteCountRow>()
        .all(db)
        .await?;

    let mut map: HashMap<i32, VoteTally> = HashMap::new();
    for row in rows {
        map.entry(row.petition_id)
            .or_default()
            .record(row.vote_type, row.count);
    }
    Ok(map)
}

pub async fn tally<C>(db: &C, petition_id: i32) -> Result<VoteTally, DbErr>
where
    C: ConnectionTrait,
{
    Ok(tallies(db, &[petition_id])
        .await?
        .remove(&petition_id)
        .unwrap_or_default())
}

async fn decorate(
    db: &DatabaseConnection,
    petitions: Vec<movie_petitions::Model>,
) -> Result<Vec<PetitionView>, DbErr> {
    let ids: Vec<i32> = petitions.iter().map(|p| p.id).collect();
    let counts = tallies(db, &ids).await?;
    let names = crate::user::get_names(db, petitions.iter().map(|p| p.petitioner_id)).await?;

    Ok(petitions
        .into_iter()
        .map(|p| {
            let tally = counts.get(&p.id).copied().unwrap_or_default();
            let name = names
                .get(&p.petitioner_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            PetitionView::new(p, name, tally)
        })
        .collect())
}

/// Active petitions, highest net score first, newest first among equals.
pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<PetitionView>, DbErr> {
    let petitions = movie_petitions::Entity::find()
        .filter(movie_petitions::Column::IsActive.eq(true))
        .order_by_desc(movie_petitions::Column::CreatedAt)
        .all(db)
        .await?;

    let mut views = decorate(db, petitions).await?;
    sort_by_score(&mut views);
    Ok(views)
}

/// Every petition, newest first, for moderation.
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<PetitionView>, DbErr> {
    let petitions = movie_petitions::Entity::find()
        .order_by_desc(movie_petitions::Column::CreatedAt)
        .order_by_desc(movie_petitions::Column::Id)
        .all(db)
        .await?;

    decorate(db, petitions).await
}

async fn current_vote<C>(
    db: &C,
    petition_id: i32,
    voter_id: i32,
) -> Result<Option<petition_votes::Model>, DbErr>
where
    C: ConnectionTrait,
{
    petition_votes::Entity::find()
        .filter(petition_votes::Column::PetitionId.eq(petition_id))
        .filter(petition_votes::Column::VoterId.eq(voter_id))
        .one(db)
        .await
}

/// A petition with its tallies and the viewer's own vote.
pub async fn show_petition(
    db: &DatabaseConnection,
    petition_id: i32,
    viewer_id: Option<i32>,
) -> Result<PetitionDetail, ServiceError> {
    let petition = get_petition(db, petition_id).await?;

    let user_vote = match viewer_id {
        Some(viewer_id) => VoteState::from(
            current_vote(db, petition_id, viewer_id)
                .await?
                .map(|v| v.vote_type),
        ),
        None => VoteState::NoVote,
    };

    let petition = decorate(db, vec![petition])
        .await?
        .pop()
        .ok_or(ServiceError::NotFound("Petition"))?;

    Ok(PetitionDetail {
        petition,
        user_vote,
    })
}

/// Casts, withdraws or flips `voter_id`'s vote on a petition.
///
/// The read of the current vote, the write and the tally all happen in one
/// transaction. When two votes by the same voter race, the loser either meets
/// the (petition, voter) unique index or fails to take the write lock; both
/// roll back and answer with a conflict.
pub async fn cast_vote(
    db: &DatabaseConnection,
    petition_id: i32,
    voter_id: i32,
    direction: VoteDirection,
) -> Result<VoteOutcome, ServiceError> {
    let txn = db.begin().await?;
    let result = match apply_vote(&txn, petition_id, voter_id, direction).await {
        Ok(outcome) => txn.commit().await.map(|_| outcome).map_err(ServiceError::from),
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                log::warn!("Rollback of vote on petition {} failed: {}", petition_id, rollback);
            }
            Err(e)
        }
    };

    match result {
        Ok(outcome) => {
            log::info!(
                "Vote {:?} by user {} on petition {} ({:?}), net {}",
                direction,
                voter_id,
                petition_id,
                outcome.action,
                outcome.net_votes
            );
            Ok(outcome)
        }
        Err(ServiceError::Database(e))
            if crate::db::is_unique_violation(&e) || crate::db::is_write_conflict(&e) =>
        {
            log::warn!(
                "Concurrent vote by user {} on petition {} lost the race: {}",
                voter_id,
                petition_id,
                e
            );
            Err(ServiceError::Conflict(
                "Your vote changed while this request was processed; please retry".to_string(),
            ))
        }
        Err(e) => Err(e),
    }
}

async fn apply_vote(
    txn: &DatabaseTransaction,
    petition_id: i32,
    voter_id: i32,
    direction: VoteDirection,
) -> Result<VoteOutcome, ServiceError> {
    let petition = get_petition(txn, petition_id).await?;

    if petition.petitioner_id == voter_id {
        return Err(ServiceError::Forbidden(
            "You cannot vote on your own petition".to_string(),
        ));
    }
    if !petition.is_active {
        return Err(ServiceError::Forbidden(
            "This petition is closed".to_string(),
        ));
    }

    let existing = current_vote(txn, petition_id, voter_id).await?;
    let current = VoteState::from(existing.as_ref().map(|v| v.vote_type));
    let (user_vote, action) = transition(current, direction);

    match (existing, action) {
        (None, _) => {
            petition_votes::ActiveModel {
                petition_id: Set(petition_id),
                voter_id: Set(voter_id),
                vote_type: Set(direction.as_vote_type()),
                created_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }
        (Some(vote), VoteAction::Removed) => {
            petition_votes::Entity::delete_by_id(vote.id)
                .exec(txn)
                .await?;
        }
        (Some(vote), _) => {
            let mut active: petition_votes::ActiveModel = vote.into();
            active.vote_type = Set(direction.as_vote_type());
            active.update(txn).await?;
        }
    }

    let counts = tally(txn, petition_id).await?;

    Ok(VoteOutcome {
        action,
        user_vote,
        upvotes: counts.upvotes,
        downvotes: counts.downvotes,
        net_votes: counts.net(),
    })
}

// ============ Moderation ============

/// Flags every listed petition as reviewed by an admin.
pub async fn mark_reviewed(db: &DatabaseConnection, petition_ids: &[i32]) -> Result<u64, DbErr> {
    if petition_ids.is_empty() {
        return Ok(0);
    }

    let result = movie_petitions::Entity::update_many()
        .col_expr(movie_petitions::Column::AdminReviewed, Expr::value(true))
        .filter(movie_petitions::Column::Id.is_in(petition_ids.to_vec()))
        .exec(db)
        .await?;

    log::info!("{} petitions marked reviewed", result.rows_affected);
    Ok(result.rows_affected)
}

/// Opens or closes every listed petition.
pub async fn set_petitions_active(
    db: &DatabaseConnection,
    petition_ids: &[i32],
    active: bool,
) -> Result<u64, DbErr> {
    if petition_ids.is_empty() {
        return Ok(0);
    }

    let result = movie_petitions::Entity::update_many()
        .col_expr(movie_petitions::Column::IsActive, Expr::value(active))
        .filter(movie_petitions::Column::Id.is_in(petition_ids.to_vec()))
        .exec(db)
        .await?;

    log::info!(
        "{} petitions {}",
        result.rows_affected,
        if active { "activated" } else { "deactivated" }
    );
    Ok(result.rows_affected)
}
