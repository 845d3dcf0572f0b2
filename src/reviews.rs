//! Review lifecycle and moderation.
//!
//! A review starts active. The first report hides it; only an admin can make
//! it visible again.

use crate::error::{not_blank, ServiceError};
use crate::orm::{reports, reviews};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, DatabaseConnection, DatabaseTransaction, DbErr,
    FromQueryResult,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of a new or edited review.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewInput {
    #[validate(
        custom = "not_blank",
        length(max = 255, message = "must be at most 255 characters")
    )]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReportInput {
    #[serde(default)]
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub reason: String,
}

/// Outcome of a report. Only `ReportedAndHidden` changed anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    AlreadyHidden,
    AlreadyReported,
    ReportedAndHidden,
}

/// Fetches a review through the movie it belongs to.
pub async fn get_review<C>(db: &C, movie_id: i32, review_id: i32) -> Result<reviews::Model, ServiceError>
where
    C: ConnectionTrait,
{
    reviews::Entity::find_by_id(review_id)
        .filter(reviews::Column::MovieId.eq(movie_id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Review"))
}

/// Posts a review. New reviews are always visible.
pub async fn create_review(
    db: &DatabaseConnection,
    movie_id: i32,
    user_id: i32,
    input: &ReviewInput,
) -> Result<reviews::Model, ServiceError> {
    input.validate()?;
    crate::movies::get_movie(db, movie_id).await?;

    let review = reviews::ActiveModel {
        comment: Set(input.comment.trim().to_string()),
        created_at: Set(Utc::now().naive_utc()),
        movie_id: Set(movie_id),
        user_id: Set(user_id),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!(
        "Review {} posted on movie {} by user {}",
        review.id,
        movie_id,
        user_id
    );
    Ok(review)
}

/// Returns a review to its author for editing.
pub async fn get_review_for_edit(
    db: &DatabaseConnection,
    movie_id: i32,
    review_id: i32,
    user_id: i32,
) -> Result<reviews::Model, ServiceError> {
    let review = get_review(db, movie_id, review_id).await?;
    require_author(&review, user_id)?;
    Ok(review)
}

/// Replaces the comment of a review. Author only; visibility is untouched.
pub async fn edit_review(
    db: &DatabaseConnection,
    movie_id: i32,
    review_id: i32,
    user_id: i32,
    input: &ReviewInput,
) -> Result<reviews::Model, ServiceError> {
    let review = get_review(db, movie_id, review_id).await?;
    require_author(&review, user_id)?;
    input.validate()?;

    let mut active: reviews::ActiveModel = review.into();
    active.comment = Set(input.comment.trim().to_string());
    Ok(active.update(db).await?)
}

/// Deletes a review. Author only.
pub async fn delete_review(
    db: &DatabaseConnection,
    movie_id: i32,
    review_id: i32,
    user_id: i32,
) -> Result<(), ServiceError> {
    let review = get_review(db, movie_id, review_id).await?;
    require_author(&review, user_id)?;

    let txn = db.begin().await?;
    reports::Entity::delete_many()
        .filter(reports::Column::ReviewId.eq(review.id))
        .exec(&txn)
        .await?;
    reviews::Entity::delete_by_id(review.id).exec(&txn).await?;
    txn.commit().await?;

    log::info!("Review {} deleted by its author {}", review.id, user_id);
    Ok(())
}

fn require_author(review: &reviews::Model, user_id: i32) -> Result<(), ServiceError> {
    if review.user_id != user_id {
        return Err(ServiceError::Forbidden(
            "Only the author may change this review".to_string(),
        ));
    }
    Ok(())
}

/// Reports a review and hides it.
///
/// The existence checks, the report insert and the hide share one
/// transaction. The hide only applies to a review that is still active, so
/// when two first reports race, exactly one of them hides the review and
/// records a report. The other rolls back and sees `AlreadyHidden`, or a
/// conflict when the database refused its write before the winner committed.
pub async fn report_review(
    db: &DatabaseConnection,
    movie_id: i32,
    review_id: i32,
    reporter_id: i32,
    input: &ReportInput,
) -> Result<ReportOutcome, ServiceError> {
    input.validate()?;

    let txn = db.begin().await?;
    let result = match file_report(&txn, movie_id, review_id, reporter_id, input).await {
        Ok(ReportOutcome::ReportedAndHidden) => txn
            .commit()
            .await
            .map(|_| ReportOutcome::ReportedAndHidden)
            .map_err(ServiceError::from),
        Ok(outcome) => txn.rollback().await.map(|_| outcome).map_err(ServiceError::from),
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                log::warn!("Rollback of report on review {} failed: {}", review_id, rollback);
            }
            Err(e)
        }
    };

    match result {
        Ok(ReportOutcome::ReportedAndHidden) => {
            log::info!(
                "Review {} reported by user {} and hidden",
                review_id,
                reporter_id
            );
            Ok(ReportOutcome::ReportedAndHidden)
        }
        Err(ServiceError::Database(e)) if crate::db::is_write_conflict(&e) => {
            log::warn!(
                "Report by user {} on review {} lost a write race: {}",
                reporter_id,
                review_id,
                e
            );
            let review = get_review(db, movie_id, review_id).await?;
            if review.is_active {
                Err(ServiceError::Conflict(
                    "The review changed while this report was processed; please retry".to_string(),
                ))
            } else {
                Ok(ReportOutcome::AlreadyHidden)
            }
        }
        other => other,
    }
}

async fn file_report(
    txn: &DatabaseTransaction,
    movie_id: i32,
    review_id: i32,
    reporter_id: i32,
    input: &ReportInput,
) -> Result<ReportOutcome, ServiceError> {
    let review = get_review(txn, movie_id, review_id).await?;

    if !review.is_active {
        return Ok(ReportOutcome::AlreadyHidden);
    }

    let already_reported = reports::Entity::find()
        .filter(reports::Column::ReviewId.eq(review.id))
        .filter(reports::Column::ReporterId.eq(reporter_id))
        .count(txn)
        .await?
        > 0;
    if already_reported {
        return Ok(ReportOutcome::AlreadyReported);
    }

    let hidden = reviews::Entity::update_many()
        .col_expr(reviews::Column::IsActive, Expr::value(false))
        .filter(reviews::Column::Id.eq(review.id))
        .filter(reviews::Column::IsActive.eq(true))
        .exec(txn)
        .await?;
    if hidden.rows_affected == 0 {
        return Ok(ReportOutcome::AlreadyHidden);
    }

    reports::ActiveModel {
        review_id: Set(review.id),
        reporter_id: Set(Some(reporter_id)),
        reason: Set(input.reason.trim().to_string()),
        created_at: Set(Utc::now().naive_utc()),
        resolved: Set(false),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok(ReportOutcome::ReportedAndHidden)
}

// ============ Moderation ============

/// A review row in the moderation listing.
#[derive(Clone, Debug, FromQueryResult, Serialize)]
pub struct ReviewModerationRow {
    pub id: i32,
    pub movie_id: i32,
    pub user_id: i32,
    pub comment: String,
    pub created_at: chrono::NaiveDateTime,
    pub is_active: bool,
    pub report_count: i64,
}

/// Lists reviews newest first with how often each was reported.
pub async fn list_for_moderation(
    db: &DatabaseConnection,
    active: Option<bool>,
) -> Result<Vec<ReviewModerationRow>, DbErr> {
    let mut query = reviews::Entity::find()
        .select_only()
        .column(reviews::Column::Id)
        .column(reviews::Column::MovieId)
        .column(reviews::Column::UserId)
        .column(reviews::Column::Comment)
        .column(reviews::Column::CreatedAt)
        .column(reviews::Column::IsActive)
        .column_as(
            Expr::cust("(SELECT COUNT(*) FROM reports WHERE reports.review_id = reviews.id)"),
            "report_count",
        )
        .order_by_desc(reviews::Column::CreatedAt)
        .order_by_desc(reviews::Column::Id);

    if let Some(active) = active {
        query = query.filter(reviews::Column::IsActive.eq(active));
    }

    query.into_model::<ReviewModerationRow>().all(db).await
}

/// Sets the visibility of every listed review. Returns the number changed.
pub async fn set_reviews_active(
    db: &DatabaseConnection,
    review_ids: &[i32],
    active: bool,
) -> Result<u64, DbErr> {
    if review_ids.is_empty() {
        return Ok(0);
    }

    let result = reviews::Entity::update_many()
        .col_expr(reviews::Column::IsActive, Expr::value(active))
        .filter(reviews::Column::Id.is_in(review_ids.to_vec()))
        .exec(db)
        .await?;

    log::info!(
        "{} of {} reviews {}",
        result.rows_affected,
        review_ids.len(),
        if active { "reinstated" } else { "hidden" }
    );
    Ok(result.rows_affected)
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportView {
    pub id: i32,
    pub review_id: i32,
    pub reporter_id: Option<i32>,
    pub reason: String,
    pub created_at: chrono::NaiveDateTime,
    pub resolved: bool,
}

impl From<reports::Model> for ReportView {
    fn from(r: reports::Model) -> Self {
        Self {
            id: r.id,
            review_id: r.review_id,
            reporter_id: r.reporter_id,
            reason: r.reason,
            created_at: r.created_at,
            resolved: r.resolved,
        }
    }
}

/// Lists reports newest first, optionally by resolved state.
pub async fn list_reports(
    db: &DatabaseConnection,
    resolved: Option<bool>,
) -> Result<Vec<reports::Model>, DbErr> {
    let mut query = reports::Entity::find()
        .order_by_desc(reports::Column::CreatedAt)
        .order_by_desc(reports::Column::Id);

    if let Some(resolved) = resolved {
        query = query.filter(reports::Column::Resolved.eq(resolved));
    }

    query.all(db).await
}

/// Marks every listed report resolved. Returns the number changed.
pub async fn resolve_reports(db: &DatabaseConnection, report_ids: &[i32]) -> Result<u64, DbErr> {
    if report_ids.is_empty() {
        return Ok(0);
    }

    let result = reports::Entity::update_many()
        .col_expr(reports::Column::Resolved, Expr::value(true))
        .filter(reports::Column::Id.is_in(report_ids.to_vec()))
        .filter(reports::Column::Resolved.eq(false))
        .exec(db)
        .await?;

    log::info!("{} reports resolved", result.rows_affected);
    Ok(result.rows_affected)
}
