//! Integration tests for expiration date rules.
//!
//! Routine updates only move a date forward. `change_expiration_date` can move
//! it anywhere but asks first when the new date is earlier.

#![allow(clippy::unwrap_used)]

use espf_admin::models::UserField;
use espf_admin::services::{
    AccountError, AppliedUpdate, FieldFailure, MonotonicityViolation, Outcome, ScriptedPrompt,
    UpdateReport, UserUpdate,
};
use espf_integration_tests::{TestContext, date, days_from_today};

async fn update_expiration(ctx: &TestContext, username: &str, expiration: &str) -> UpdateReport {
    ctx.service
        .update(
            username,
            UserUpdate {
                expiration: Some(expiration.to_owned()),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap()
}

fn expiration_failure(report: &UpdateReport) -> &AccountError {
    match report.failures.as_slice() {
        [
            FieldFailure {
                field: UserField::ExpirationDate,
                error,
            },
        ] => error,
        other => panic!("expected one expiration failure, got {other:?}"),
    }
}

// =============================================================================
// Routine Updates
// =============================================================================

#[tokio::test]
async fn test_update_to_today_or_earlier_is_refused() {
    let ctx = TestContext::logged_in().await;
    ctx.service.add("alice", "pw", false, None).await.unwrap();

    for expiration in [days_from_today(0), days_from_today(-1), "2000-01-01".to_owned()] {
        let report = update_expiration(&ctx, "alice", &expiration).await;
        assert!(report.is_unmodified());
        assert!(matches!(
            expiration_failure(&report),
            AccountError::Monotonicity(MonotonicityViolation::BeforeToday { .. })
        ));
    }
    assert_eq!(ctx.service.get("alice").await.unwrap().expiration_date, None);
}

#[tokio::test]
async fn test_update_not_after_current_is_refused() {
    let ctx = TestContext::logged_in().await;
    ctx.service
        .add("alice", "pw", false, Some("2999-06-15"))
        .await
        .unwrap();

    for expiration in ["2999-06-15", "2999-06-14", "2998-01-01"] {
        let report = update_expiration(&ctx, "alice", expiration).await;
        assert!(matches!(
            expiration_failure(&report),
            AccountError::Monotonicity(MonotonicityViolation::NotAfterCurrent { .. })
        ));
    }
    assert_eq!(
        ctx.service.get("alice").await.unwrap().expiration_date,
        Some(date("2999-06-15"))
    );
}

#[tokio::test]
async fn test_update_strictly_later_succeeds() {
    let ctx = TestContext::logged_in().await;
    ctx.service.add("alice", "pw", false, None).await.unwrap();

    let tomorrow = days_from_today(1);
    let report = update_expiration(&ctx, "alice", &tomorrow).await;
    assert_eq!(report.applied, [AppliedUpdate::ExpirationDate(date(&tomorrow))]);

    let report = update_expiration(&ctx, "alice", "2999-01-01").await;
    assert_eq!(report.applied, [AppliedUpdate::ExpirationDate(date("2999-01-01"))]);
    assert_eq!(
        ctx.service.get("alice").await.unwrap().expiration_date,
        Some(date("2999-01-01"))
    );
}

#[tokio::test]
async fn test_update_rejects_malformed_dates() {
    let ctx = TestContext::logged_in().await;
    ctx.service.add("alice", "pw", false, None).await.unwrap();

    for expiration in ["2999-02-29", "2999/01/01", "2999-01", "2999-01-01-01", "year-01-01"] {
        let report = update_expiration(&ctx, "alice", expiration).await;
        assert!(
            matches!(expiration_failure(&report), AccountError::InvalidDate(_)),
            "{expiration} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_expiration_failure_keeps_earlier_fields() {
    let ctx = TestContext::logged_in().await;
    ctx.service.add("alice", "pw", false, None).await.unwrap();

    let report = ctx
        .service
        .update(
            "alice",
            UserUpdate {
                activated: Some(true),
                expiration: Some("2000-01-01".to_owned()),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(report.applied, [AppliedUpdate::Activated(true)]);
    assert!(matches!(
        expiration_failure(&report),
        AccountError::Monotonicity(_)
    ));
    let alice = ctx.service.get("alice").await.unwrap();
    assert!(alice.activated);
    assert_eq!(alice.expiration_date, None);
}

#[tokio::test]
async fn test_update_after_rename_addresses_new_name() {
    let ctx = TestContext::logged_in().await;
    ctx.service.add("alice", "pw", false, None).await.unwrap();

    let report = ctx
        .service
        .update(
            "alice",
            UserUpdate {
                new_username: Some("alicia".to_owned()),
                expiration: Some("2999-01-01".to_owned()),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.username, "alicia");
    assert_eq!(
        ctx.service.get("alicia").await.unwrap().expiration_date,
        Some(date("2999-01-01"))
    );
}

// =============================================================================
// Force Path
// =============================================================================

#[tokio::test]
async fn test_changedate_forward_never_prompts() {
    let ctx = TestContext::logged_in().await;
    ctx.service
        .add("alice", "pw", false, Some("2990-01-01"))
        .await
        .unwrap();

    for new_date in ["2990-01-01", "2995-05-05"] {
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let outcome = ctx
            .service
            .change_expiration_date("alice", new_date, &mut prompt)
            .await
            .unwrap();

        assert!(prompt.asked().is_empty());
        assert_eq!(
            outcome.completed().unwrap().expiration_date,
            Some(date(new_date))
        );
    }
}

#[tokio::test]
async fn test_changedate_backward_prompts() {
    let ctx = TestContext::logged_in().await;
    ctx.service
        .add("alice", "pw", false, Some("2990-01-01"))
        .await
        .unwrap();

    let mut prompt = ScriptedPrompt::new(["no"]);
    let outcome = ctx
        .service
        .change_expiration_date("alice", "2000-01-01", &mut prompt)
        .await
        .unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(
        prompt.asked(),
        [
            "You are going to update to an expiration date 2000-01-01 which is before the actual one 2990-01-01, do you confirm (yes/no): "
        ]
    );
    assert_eq!(
        ctx.service.get("alice").await.unwrap().expiration_date,
        Some(date("2990-01-01"))
    );

    let mut prompt = ScriptedPrompt::new(["yes"]);
    ctx.service
        .change_expiration_date("alice", "2000-01-01", &mut prompt)
        .await
        .unwrap();
    assert_eq!(
        ctx.service.get("alice").await.unwrap().expiration_date,
        Some(date("2000-01-01"))
    );
}

#[tokio::test]
async fn test_changedate_invalid_date_or_missing_user() {
    let ctx = TestContext::logged_in().await;
    ctx.service.add("alice", "pw", false, None).await.unwrap();
    let mut prompt = ScriptedPrompt::new(["yes"]);

    assert!(matches!(
        ctx.service
            .change_expiration_date("alice", "2023-02-29", &mut prompt)
            .await,
        Err(AccountError::InvalidDate(_))
    ));
    assert!(matches!(
        ctx.service
            .change_expiration_date("ghost", "2999-01-01", &mut prompt)
            .await,
        Err(AccountError::NotFound(_))
    ));
    assert!(prompt.asked().is_empty());
}

#[tokio::test]
async fn test_changedate_confirmation_reprompts_on_garbage() {
    let ctx = TestContext::logged_in().await;
    ctx.service.add("alice", "pw", false, None).await.unwrap();

    let mut prompt = ScriptedPrompt::new(["y", "", "No"]);
    let outcome = ctx
        .service
        .change_expiration_date("alice", "2999-01-01", &mut prompt)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(prompt.asked().len(), 3);
    assert_eq!(prompt.notices().len(), 2);
}
