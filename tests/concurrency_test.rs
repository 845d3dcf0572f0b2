//! Racing votes and reports against a file-backed database with a real pool

mod common;

use chrono::Utc;
use common::{database::*, fixtures::*};
use futures::future::join_all;
use marquee::error::ServiceError;
use marquee::orm::reports;
use marquee::petitions::{self, VoteAction, VoteDirection};
use marquee::reviews::{self, ReportInput, ReportOutcome};
use sea_orm::{entity::*, query::*};
use serial_test::serial;

#[actix_rt::test]
#[serial]
async fn test_racing_votes_by_one_voter_leave_one_row() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = setup_file_database(&dir)
        .await
        .expect("Failed to setup file database");

    let petitioner = create_test_user(&db, "petitioner").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let petition = create_test_petition(&db, petitioner.id, "Ran", Utc::now().naive_utc())
        .await
        .unwrap();

    let results = join_all(
        (0..8).map(|_| petitions::cast_vote(&db, petition.id, voter.id, VoteDirection::Up)),
    )
    .await;

    let mut added = 0;
    let mut removed = 0;
    for result in &results {
        match result {
            Ok(outcome) if outcome.action == VoteAction::Added => added += 1,
            Ok(outcome) if outcome.action == VoteAction::Removed => removed += 1,
            Ok(outcome) => panic!("Unexpected vote action {:?}", outcome.action),
            Err(ServiceError::Conflict(_)) => {}
            Err(e) => panic!("Racing vote surfaced as an internal error: {:?}", e),
        }
    }
    assert!(added >= 1, "At least one vote should get through");

    let votes = get_votes(&db, petition.id).await.unwrap();
    assert!(votes.len() <= 1);
    assert_eq!(votes.len() as i32, added - removed);
    assert!(votes.iter().all(|v| v.voter_id == voter.id));
}

#[actix_rt::test]
#[serial]
async fn test_racing_first_reports_hide_once() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = setup_file_database(&dir)
        .await
        .expect("Failed to setup file database");

    let author = create_test_user(&db, "author").await.unwrap();
    let movie = create_test_movie(&db, "Heat").await.unwrap();
    let review = create_test_review(&db, movie.id, author.id, "Buy pills", 0)
        .await
        .unwrap();

    let mut reporters = Vec::new();
    for i in 0..6 {
        reporters.push(
            create_test_user(&db, &format!("reporter{}", i))
                .await
                .unwrap(),
        );
    }

    let input = ReportInput {
        reason: "spam".to_string(),
    };
    let results = join_all(
        reporters
            .iter()
            .map(|r| reviews::report_review(&db, movie.id, review.id, r.id, &input)),
    )
    .await;

    let mut hidden_by = 0;
    for result in &results {
        match result {
            Ok(ReportOutcome::ReportedAndHidden) => hidden_by += 1,
            Ok(ReportOutcome::AlreadyHidden) | Err(ServiceError::Conflict(_)) => {}
            Ok(other) => panic!("Unexpected report outcome {:?}", other),
            Err(e) => panic!("Racing report surfaced as an internal error: {:?}", e),
        }
    }
    assert_eq!(hidden_by, 1);

    let stored = reports::Entity::find()
        .filter(reports::Column::ReviewId.eq(review.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(stored, 1);
    assert!(!get_review(&db, review.id).await.unwrap().is_active);
}
