//! Integration tests for the review lifecycle: posting, editing, reporting and moderation

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use marquee::error::ServiceError;
use marquee::reviews::{self, ReportInput, ReportOutcome, ReviewInput};

fn comment(text: &str) -> ReviewInput {
    ReviewInput {
        comment: text.to_string(),
    }
}

#[actix_rt::test]
#[serial]
async fn test_create_review_starts_active() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "reviewer").await.unwrap();
    let movie = create_test_movie(&db, "Heat").await.unwrap();

    let review = reviews::create_review(&db, movie.id, user.id, &comment("  Great heist.  "))
        .await
        .expect("Failed to create review");

    assert!(review.is_active);
    assert_eq!(review.comment, "Great heist.");
    assert_eq!(review.movie_id, movie.id);

    let detail = marquee::movies::show_movie(&db, movie.id).await.unwrap();
    assert_eq!(detail.reviews.len(), 1);
    assert_eq!(detail.reviews[0].user_name, "reviewer");
}

#[actix_rt::test]
#[serial]
async fn test_create_review_validation() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "reviewer").await.unwrap();
    let movie = create_test_movie(&db, "Heat").await.unwrap();

    let blank = reviews::create_review(&db, movie.id, user.id, &comment("   ")).await;
    assert!(matches!(blank, Err(ServiceError::Validation(_))));

    let long = reviews::create_review(&db, movie.id, user.id, &comment(&"a".repeat(256))).await;
    assert!(matches!(long, Err(ServiceError::Validation(_))));

    let missing = reviews::create_review(&db, movie.id + 100, user.id, &comment("Fine")).await;
    assert!(matches!(missing, Err(ServiceError::NotFound("Movie"))));
}

#[actix_rt::test]
#[serial]
async fn test_only_author_may_edit_or_delete() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "author").await.unwrap();
    let other = create_test_user(&db, "other").await.unwrap();
    let movie = create_test_movie(&db, "Alien").await.unwrap();
    let review = create_test_review(&db, movie.id, author.id, "Scary", 0)
        .await
        .unwrap();

    let edit = reviews::edit_review(&db, movie.id, review.id, other.id, &comment("Boring")).await;
    assert!(matches!(edit, Err(ServiceError::Forbidden(_))));

    let delete = reviews::delete_review(&db, movie.id, review.id, other.id).await;
    assert!(matches!(delete, Err(ServiceError::Forbidden(_))));

    let edited = reviews::edit_review(&db, movie.id, review.id, author.id, &comment("Terrifying"))
        .await
        .expect("Author should be able to edit");
    assert_eq!(edited.comment, "Terrifying");
    assert!(edited.is_active);

    reviews::delete_review(&db, movie.id, review.id, author.id)
        .await
        .expect("Author should be able to delete");
    assert!(get_review(&db, review.id).await.is_err());
}

#[actix_rt::test]
#[serial]
async fn test_review_must_belong_to_movie() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "author").await.unwrap();
    let alien = create_test_movie(&db, "Alien").await.unwrap();
    let aliens = create_test_movie(&db, "Aliens").await.unwrap();
    let review = create_test_review(&db, alien.id, author.id, "Scary", 0)
        .await
        .unwrap();

    let result = reviews::get_review_for_edit(&db, aliens.id, review.id, author.id).await;
    assert!(matches!(result, Err(ServiceError::NotFound("Review"))));
}

#[actix_rt::test]
#[serial]
async fn test_report_hides_review() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "author").await.unwrap();
    let first = create_test_user(&db, "first_reporter").await.unwrap();
    let second = create_test_user(&db, "second_reporter").await.unwrap();
    let movie = create_test_movie(&db, "Heat").await.unwrap();
    let review = create_test_review(&db, movie.id, author.id, "Spam spam", 0)
        .await
        .unwrap();

    let outcome = reviews::report_review(&db, movie.id, review.id, first.id, &ReportInput::default())
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::ReportedAndHidden);
    assert!(!get_review(&db, review.id).await.unwrap().is_active);

    // A hidden review no longer shows under its movie
    let detail = marquee::movies::show_movie(&db, movie.id).await.unwrap();
    assert!(detail.reviews.is_empty());

    let outcome = reviews::report_review(&db, movie.id, review.id, second.id, &ReportInput::default())
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::AlreadyHidden);

    let reports = reviews::list_reports(&db, None).await.unwrap();
    assert_eq!(reports.len(), 1, "Only the first report is recorded");
    assert_eq!(reports[0].reporter_id, Some(first.id));
}

#[actix_rt::test]
#[serial]
async fn test_report_after_reinstate() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "author").await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let other = create_test_user(&db, "other").await.unwrap();
    let movie = create_test_movie(&db, "Heat").await.unwrap();
    let review = create_test_review(&db, movie.id, author.id, "Borderline", 0)
        .await
        .unwrap();

    let input = ReportInput {
        reason: "offensive".to_string(),
    };
    reviews::report_review(&db, movie.id, review.id, reporter.id, &input)
        .await
        .unwrap();

    let changed = reviews::set_reviews_active(&db, &[review.id], true)
        .await
        .unwrap();
    assert_eq!(changed, 1);
    assert!(get_review(&db, review.id).await.unwrap().is_active);

    // The same reporter cannot hide it again
    let outcome = reviews::report_review(&db, movie.id, review.id, reporter.id, &input)
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::AlreadyReported);
    assert!(get_review(&db, review.id).await.unwrap().is_active);

    // Someone else can
    let outcome = reviews::report_review(&db, movie.id, review.id, other.id, &input)
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::ReportedAndHidden);
    assert!(!get_review(&db, review.id).await.unwrap().is_active);
}

#[actix_rt::test]
#[serial]
async fn test_moderation_listing_and_resolve() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "author").await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let movie = create_test_movie(&db, "Heat").await.unwrap();
    let older = create_test_review(&db, movie.id, author.id, "Older", 10)
        .await
        .unwrap();
    let newer = create_test_review(&db, movie.id, author.id, "Newer", 1)
        .await
        .unwrap();

    reviews::report_review(&db, movie.id, older.id, reporter.id, &ReportInput::default())
        .await
        .unwrap();

    let all = reviews::list_for_moderation(&db, None).await.unwrap();
    let ids: Vec<i32> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert_eq!(all[0].report_count, 0);
    assert_eq!(all[1].report_count, 1);

    let hidden = reviews::list_for_moderation(&db, Some(false)).await.unwrap();
    assert_eq!(hidden.len(), 1);
    assert_eq!(hidden[0].id, older.id);

    let open = reviews::list_reports(&db, Some(false)).await.unwrap();
    assert_eq!(open.len(), 1);

    let resolved = reviews::resolve_reports(&db, &[open[0].id]).await.unwrap();
    assert_eq!(resolved, 1);
    // Resolving twice changes nothing
    assert_eq!(reviews::resolve_reports(&db, &[open[0].id]).await.unwrap(), 0);

    assert!(reviews::list_reports(&db, Some(false)).await.unwrap().is_empty());
    assert_eq!(reviews::list_reports(&db, Some(true)).await.unwrap().len(), 1);

    // Resolving does not reinstate the review
    assert!(!get_review(&db, older.id).await.unwrap().is_active);
}

#[actix_rt::test]
#[serial]
async fn test_deleting_review_removes_its_reports() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "author").await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let movie = create_test_movie(&db, "Heat").await.unwrap();
    let review = create_test_review(&db, movie.id, author.id, "Regret", 0)
        .await
        .unwrap();

    reviews::report_review(&db, movie.id, review.id, reporter.id, &ReportInput::default())
        .await
        .unwrap();
    reviews::delete_review(&db, movie.id, review.id, author.id)
        .await
        .unwrap();

    assert!(reviews::list_reports(&db, None).await.unwrap().is_empty());
}
