//! Request lifecycle, approval sequencing and dashboard queries against a
//! real (in-memory) SQLite store.

mod common;

use approval_desk::errors::AppError;
use approval_desk::models::approval::{Decision, ManagerLevel};
use approval_desk::models::dashboard::{DashboardQuery, SortKey, StatusFilter};
use approval_desk::models::request::{RequestDraft, RequestStatus, RequestType};
use approval_desk::store::sqlite::SqliteStore;
use approval_desk::workflow::approval::{decide, DecisionForm};
use approval_desk::workflow::{dashboard, lifecycle};
use tokio_test::assert_ok;

use common::{draft_for, price_reduction_draft, test_store};

const BASE: &str = "http://localhost:5000";

fn decision(value: &str, name: &str) -> DecisionForm {
    DecisionForm {
        decision: Some(value.into()),
        approver_name: Some(name.into()),
        comments: Some("checked against SPA".into()),
    }
}

async fn submit(db: &SqliteStore, draft: RequestDraft) -> i64 {
    lifecycle::create(db, BASE, draft).await.expect("valid draft").id
}

// ═══════════════════════════════════════════════════════════════════════════
// Submission & edit
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_starts_pending_l1() {
    let db = test_store().await;
    let created = assert_ok!(lifecycle::create(&db, BASE, price_reduction_draft()).await);
    assert!(created
        .edit_link
        .starts_with("http://localhost:5000/request/edit/"));

    let detail = assert_ok!(lifecycle::read(&db, created.id).await);
    assert_eq!(detail.request.status, RequestStatus::PendingL1);
    assert_eq!(detail.request.step, 1);
    assert_eq!(detail.request.project_name(), "Project A");
    assert!(detail.request.draft.is_selected(RequestType::PriceReduction));
    assert!(!detail.request.draft.is_selected(RequestType::Refund));
    assert_eq!(detail.request.draft.get("pr_selling_price"), "855000");
    assert!(detail.approvals.is_empty());

    let token = created.edit_link.rsplit('/').next().unwrap();
    assert_eq!(token, detail.request.edit_token);
}

#[tokio::test]
async fn test_create_with_blank_required_field_writes_nothing() {
    let db = test_store().await;
    let mut draft = price_reduction_draft();
    draft.set("agent_contact", "  ");

    match lifecycle::create(&db, BASE, draft).await {
        Err(AppError::Validation { errors, draft }) => {
            assert_eq!(errors, vec!["Agent Contact Number is required."]);
            // submitted values come back for re-display
            assert_eq!(draft.get("buyer_name"), "Omar Haddad");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(db.status_counts().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_create_missing_selected_sub_field_names_it() {
    let db = test_store().await;
    let mut draft = price_reduction_draft();
    draft.set("pr_discount_percent", "");

    match lifecycle::create(&db, BASE, draft).await {
        Err(AppError::Validation { errors, .. }) => assert_eq!(
            errors,
            vec!["Field 'pr_discount_percent' is required because this request type is selected."]
        ),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_edit_tokens_are_unique_per_request() {
    let db = test_store().await;
    let a = lifecycle::read(&db, submit(&db, price_reduction_draft()).await).await.unwrap();
    let b = lifecycle::read(&db, submit(&db, price_reduction_draft()).await).await.unwrap();
    assert_ne!(a.request.edit_token, b.request.edit_token);
}

#[tokio::test]
async fn test_edit_preserves_identity_and_state() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;
    assert_ok!(decide(&db, ManagerLevel::One, id, &decision("Approved", "Manager One")).await);
    let before = lifecycle::read(&db, id).await.unwrap().request;

    let mut draft = draft_for("Project B", "44");
    draft.selected.clear();
    draft.select(RequestType::Others).set("others_text", "Change buyer name spelling");
    let edited_id = assert_ok!(lifecycle::edit(&db, &before.edit_token, draft).await);
    assert_eq!(edited_id, id);

    let after = lifecycle::read(&db, id).await.unwrap().request;
    assert_eq!(after.id, before.id);
    assert_eq!(after.edit_token, before.edit_token);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.status, RequestStatus::PendingL2);
    assert_eq!(after.step, 2);
    assert!(after.updated_at >= before.updated_at);

    assert_eq!(after.project_name(), "Project B");
    assert_eq!(after.unit_number(), "44");
    assert!(after.draft.is_selected(RequestType::Others));
    assert!(!after.draft.is_selected(RequestType::PriceReduction));
    assert_eq!(after.draft.get("others_text"), "Change buyer name spelling");
}

#[tokio::test]
async fn test_edit_with_unknown_token_is_not_found() {
    let db = test_store().await;
    let result = lifecycle::edit(&db, "no-such-token", price_reduction_draft()).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_invalid_edit_leaves_request_untouched() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;
    let before = lifecycle::read(&db, id).await.unwrap().request;

    let mut draft = draft_for("Project C", "7");
    draft.set("requested_by_date", "");
    let result = lifecycle::edit(&db, &before.edit_token, draft).await;
    assert!(matches!(result, Err(AppError::Validation { .. })));

    let after = lifecycle::read(&db, id).await.unwrap().request;
    assert_eq!(after.project_name(), "Project A");
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn test_inconsistent_status_and_step_is_internal_error() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;
    sqlx::query("UPDATE requests SET current_step = 0 WHERE id = ?")
        .bind(id)
        .execute(db.pool())
        .await
        .unwrap();

    match lifecycle::read(&db, id).await {
        Err(AppError::Internal(e)) => assert!(e.to_string().contains("inconsistent status")),
        other => panic!("expected internal error, got {:?}", other),
    }

    // the corrupt row is kept out of dashboard lists as well
    let listed = dashboard::load(&db, DashboardQuery::default()).await;
    assert!(matches!(listed, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn test_read_unknown_request_is_not_found() {
    let db = test_store().await;
    assert!(matches!(lifecycle::read(&db, 999).await, Err(AppError::NotFound)));
}

// ═══════════════════════════════════════════════════════════════════════════
// Approval sequencing
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_two_level_approval_happy_path() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;

    let status = assert_ok!(decide(&db, ManagerLevel::One, id, &decision("Approved", "Manager One")).await);
    assert_eq!(status, RequestStatus::PendingL2);
    let detail = lifecycle::read(&db, id).await.unwrap();
    assert_eq!(detail.request.step, 2);
    assert_eq!(detail.approvals.len(), 1);
    assert_eq!(detail.approvals[0].level, 1);
    assert_eq!(detail.approvals[0].decision, Decision::Approved);
    assert_eq!(detail.approvals[0].approver_name, "Manager One");

    let status = assert_ok!(decide(&db, ManagerLevel::Two, id, &decision("Approved", "Manager Two")).await);
    assert_eq!(status, RequestStatus::Approved);
    let detail = lifecycle::read(&db, id).await.unwrap();
    assert_eq!(detail.request.step, 0);
    assert_eq!(detail.approvals.len(), 2);
    assert_eq!(detail.approvals[1].level, 2);
    assert_eq!(
        detail.signature(ManagerLevel::Two).map(|a| a.approver_name.as_str()),
        Some("Manager Two")
    );
}

#[tokio::test]
async fn test_level_two_before_level_one_is_refused() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;
    let before = lifecycle::read(&db, id).await.unwrap().request;

    match decide(&db, ManagerLevel::Two, id, &decision("Rejected", "Manager Two")).await {
        Err(AppError::NotReady(msg)) => assert_eq!(msg, "Request is not ready for Level 2."),
        other => panic!("expected NotReady, got {:?}", other),
    }

    let detail = lifecycle::read(&db, id).await.unwrap();
    assert_eq!(detail.request.status, RequestStatus::PendingL1);
    assert_eq!(detail.request.step, 1);
    assert_eq!(detail.request.updated_at, before.updated_at);
    assert!(detail.approvals.is_empty());
}

#[tokio::test]
async fn test_level_one_rejection_is_terminal() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;

    let status = assert_ok!(decide(&db, ManagerLevel::One, id, &decision("Rejected", "Manager One")).await);
    assert_eq!(status, RequestStatus::Rejected);

    let result = decide(&db, ManagerLevel::Two, id, &decision("Approved", "Manager Two")).await;
    assert!(matches!(result, Err(AppError::NotReady(_))));

    let detail = lifecycle::read(&db, id).await.unwrap();
    assert_eq!(detail.request.status, RequestStatus::Rejected);
    assert_eq!(detail.request.step, 0);
    assert_eq!(detail.approvals.len(), 1);
}

#[tokio::test]
async fn test_level_two_rejection() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;
    assert_ok!(decide(&db, ManagerLevel::One, id, &decision("Approved", "Manager One")).await);
    let status = assert_ok!(decide(&db, ManagerLevel::Two, id, &decision("Rejected", "Manager Two")).await);
    assert_eq!(status, RequestStatus::Rejected);
    assert_eq!(lifecycle::read(&db, id).await.unwrap().request.step, 0);
}

#[tokio::test]
async fn test_level_one_cannot_decide_twice() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;
    assert_ok!(decide(&db, ManagerLevel::One, id, &decision("Approved", "Manager One")).await);

    let again = decide(&db, ManagerLevel::One, id, &decision("Rejected", "Manager One")).await;
    assert!(matches!(again, Err(AppError::NotReady(_))));

    let detail = lifecycle::read(&db, id).await.unwrap();
    assert_eq!(detail.request.status, RequestStatus::PendingL2);
    assert_eq!(detail.approvals.len(), 1);
}

#[tokio::test]
async fn test_invalid_decision_input_writes_nothing() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;

    let bad_value = decide(&db, ManagerLevel::One, id, &decision("Approve", "Manager One")).await;
    assert!(matches!(bad_value, Err(AppError::InvalidDecision(_))));
    let no_name = decide(&db, ManagerLevel::One, id, &decision("Approved", " ")).await;
    assert!(matches!(no_name, Err(AppError::InvalidDecision(_))));

    let detail = lifecycle::read(&db, id).await.unwrap();
    assert_eq!(detail.request.status, RequestStatus::PendingL1);
    assert!(detail.approvals.is_empty());
}

#[tokio::test]
async fn test_decision_on_unknown_request_is_not_found() {
    let db = test_store().await;
    let result = decide(&db, ManagerLevel::One, 42, &decision("Approved", "Manager One")).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_concurrent_level_one_decisions_record_once() {
    let db = test_store().await;
    let id = submit(&db, price_reduction_draft()).await;

    let approve = decision("Approved", "Tab A");
    let reject = decision("Rejected", "Tab B");
    let (a, b) = tokio::join!(
        decide(&db, ManagerLevel::One, id, &approve),
        decide(&db, ManagerLevel::One, id, &reject),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let detail = lifecycle::read(&db, id).await.unwrap();
    assert_eq!(detail.approvals.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Dashboard
// ═══════════════════════════════════════════════════════════════════════════

/// Four requests: #1 approved, #2 pending L2, #3 rejected, #4 pending L1.
async fn seeded() -> SqliteStore {
    let db = test_store().await;
    let one = submit(&db, draft_for("Project B", "3")).await;
    let two = submit(&db, draft_for("Project A", "12")).await;
    let three = submit(&db, draft_for("Project C", "101")).await;
    submit(&db, draft_for("Project A", "7")).await;

    decide(&db, ManagerLevel::One, one, &decision("Approved", "M1")).await.unwrap();
    decide(&db, ManagerLevel::Two, one, &decision("Approved", "M2")).await.unwrap();
    decide(&db, ManagerLevel::One, two, &decision("Approved", "M1")).await.unwrap();
    decide(&db, ManagerLevel::One, three, &decision("Rejected", "M1")).await.unwrap();
    db
}

fn ids(view: &approval_desk::models::dashboard::Dashboard) -> Vec<i64> {
    view.requests.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn test_dashboard_defaults_to_newest_first() {
    let db = seeded().await;
    let view = dashboard::load(&db, DashboardQuery::default()).await.unwrap();
    assert_eq!(ids(&view), vec![4, 3, 2, 1]);
    assert_eq!(view.projects, vec!["Project A", "Project B", "Project C"]);
    assert_eq!(view.units, vec!["101", "12", "3", "7"]);
}

#[tokio::test]
async fn test_dashboard_counts_ignore_filters() {
    let db = seeded().await;
    let queries = [
        DashboardQuery::default(),
        DashboardQuery {
            filter: StatusFilter::Approved,
            ..Default::default()
        },
        DashboardQuery {
            project: Some("Project Z".into()),
            ..Default::default()
        },
        DashboardQuery {
            filter: StatusFilter::PendingL1,
            unit: Some("7".into()),
            ..Default::default()
        },
    ];
    for q in queries {
        let view = dashboard::load(&db, q).await.unwrap();
        assert_eq!(view.stats.total, 4);
        assert_eq!(view.stats.pending_l1, 1);
        assert_eq!(view.stats.pending_l2, 1);
        assert_eq!(view.stats.approved, 1);
        assert_eq!(view.stats.rejected, 1);
    }
}

#[tokio::test]
async fn test_dashboard_status_filters() {
    let db = seeded().await;
    let cases = [
        (StatusFilter::PendingL1, vec![4]),
        (StatusFilter::PendingL2, vec![2]),
        (StatusFilter::Approved, vec![1]),
        (StatusFilter::Rejected, vec![3]),
    ];
    for (filter, expected) in cases {
        let q = DashboardQuery {
            filter,
            ..Default::default()
        };
        let view = dashboard::load(&db, q).await.unwrap();
        assert_eq!(ids(&view), expected, "filter {:?}", filter);
    }
}

#[tokio::test]
async fn test_dashboard_project_and_unit_are_exact_match() {
    let db = seeded().await;
    let by_project = DashboardQuery {
        project: Some("Project A".into()),
        ..Default::default()
    };
    assert_eq!(ids(&dashboard::load(&db, by_project).await.unwrap()), vec![4, 2]);

    let by_unit = DashboardQuery {
        unit: Some("1".into()),
        ..Default::default()
    };
    assert!(dashboard::load(&db, by_unit).await.unwrap().requests.is_empty());

    let both = DashboardQuery {
        project: Some("Project A".into()),
        unit: Some("12".into()),
        ..Default::default()
    };
    assert_eq!(ids(&dashboard::load(&db, both).await.unwrap()), vec![2]);
}

#[tokio::test]
async fn test_dashboard_sorting() {
    let db = seeded().await;
    let by_project = DashboardQuery {
        sort: SortKey::Project,
        ..Default::default()
    };
    // ties on project fall back to newest first
    assert_eq!(ids(&dashboard::load(&db, by_project).await.unwrap()), vec![4, 2, 1, 3]);

    let by_unit = DashboardQuery {
        sort: SortKey::Unit,
        ..Default::default()
    };
    // lexical, not numeric
    assert_eq!(ids(&dashboard::load(&db, by_unit).await.unwrap()), vec![3, 2, 1, 4]);
}

#[tokio::test]
async fn test_empty_dashboard() {
    let db = test_store().await;
    let view = dashboard::load(&db, DashboardQuery::default()).await.unwrap();
    assert_eq!(view.stats.total, 0);
    assert_eq!(view.stats.approved, 0);
    assert!(view.requests.is_empty());
    assert!(view.projects.is_empty());
}
