use std::sync::Arc;
use std::time::Duration;

use oleema_common::{Pagination, TrailingWindow};
use oleema_errors::AppError;
use oleema_ports::CachePort;

use super::*;
use crate::application::overage::{OverageLedger, OverageRecord};
use crate::application::session::SessionId;
use crate::application::staging::{CachePendingWorkLogStore, PendingWorkLogStore};
use crate::domain::order::OrderStatus;
use crate::domain::overage::OverageStatus;
use crate::domain::work_log::{WorkLog, WorkLogFilter};
use crate::infrastructure::cache::MemoryCache;
use crate::test_support::{Fixture, MemoryStore};

struct Harness {
    store: MemoryStore,
    staging: Arc<dyn PendingWorkLogStore>,
    handler: WorkLogCommandHandler,
}

fn harness() -> Harness {
    let store = MemoryStore::new();
    let cache: Arc<dyn CachePort> = Arc::new(MemoryCache::new(100));
    let staging: Arc<dyn PendingWorkLogStore> =
        Arc::new(CachePendingWorkLogStore::new(cache, Duration::from_secs(600)));
    let handler = WorkLogCommandHandler::new(store.factory(), staging.clone());
    Harness {
        store,
        staging,
        handler,
    }
}

async fn persisted(h: &Harness, session: &SessionId, fx: &Fixture, quantity: i32) -> WorkLog {
    match h.handler.submit(session, fx.form(quantity)).await.unwrap() {
        SubmitOutcome::Persisted(log) => log,
        other => panic!("expected persisted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_within_target_is_persisted_and_starts_order() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();

    let log = persisted(&h, &session, &fx, 40).await;

    assert_eq!(log.quantity, 40);
    assert_eq!(h.store.work_log_count(), 1);
    assert_eq!(
        h.store.order(fx.order.id).unwrap().status,
        OrderStatus::InProgress
    );
    assert!(h.handler.pending(&session).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reaching_target_exactly_is_not_an_overage() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();

    persisted(&h, &session, &fx, 60).await;
    persisted(&h, &session, &fx, 40).await;

    assert_eq!(h.store.pending_count(fx.order.id, fx.process.id), 0);
}

#[tokio::test]
async fn test_over_target_is_staged_without_writes() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();
    persisted(&h, &session, &fx, 60).await;

    let staged = match h.handler.submit(&session, fx.form(50)).await.unwrap() {
        SubmitOutcome::Staged(staged) => staged,
        other => panic!("expected staged, got {:?}", other),
    };

    assert_eq!(staged.evaluation.existing_total, 60);
    assert_eq!(staged.evaluation.new_total, 110);
    assert_eq!(staged.evaluation.overage_units, 10);
    assert!(staged.message.contains("10 over"));
    assert_eq!(h.store.work_log_count(), 1);
    assert!(h.store.all_overages().is_empty());
    assert_eq!(h.handler.pending(&session).await.unwrap(), Some(staged));
}

#[tokio::test]
async fn test_invalid_form_is_rejected_with_field_errors() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let form = WorkLogForm {
        quantity: Some("0".to_string()),
        ..fx.form(1)
    };

    match h.handler.submit(&SessionId::generate(), form).await.unwrap() {
        SubmitOutcome::Rejected(errors) => assert!(errors.get("quantity").is_some()),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(h.store.work_log_count(), 0);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let form = WorkLogForm {
        order_id: Some(uuid::Uuid::now_v7().to_string()),
        ..fx.form(5)
    };

    let err = h
        .handler
        .submit(&SessionId::generate(), form)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_discards_and_leaves_state_unchanged() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();
    persisted(&h, &session, &fx, 60).await;
    h.handler.submit(&session, fx.form(50)).await.unwrap();

    let outcome = h
        .handler
        .decide(&session, StagedAction::Cancel)
        .await
        .unwrap();

    assert!(matches!(outcome, DecisionOutcome::Discarded));
    assert_eq!(h.store.work_log_count(), 1);
    assert!(h.store.all_overages().is_empty());
    assert!(h.handler.pending(&session).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_without_staged_submission_is_noop() {
    let h = harness();
    let outcome = h
        .handler
        .decide(&SessionId::generate(), StagedAction::Cancel)
        .await
        .unwrap();
    assert!(matches!(outcome, DecisionOutcome::Discarded));
}

#[tokio::test]
async fn test_edit_returns_prefilled_form_and_clears_slot() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 10).await;
    let session = SessionId::generate();
    h.handler.submit(&session, fx.form(15)).await.unwrap();

    let form = match h.handler.decide(&session, StagedAction::Edit).await.unwrap() {
        DecisionOutcome::ReturnedToEntry(form) => form,
        other => panic!("expected form, got {:?}", other),
    };

    assert_eq!(form.quantity.as_deref(), Some("15"));
    assert_eq!(form.order_id, Some(fx.order.id.to_string()));
    assert_eq!(form.work_date.as_deref(), Some("2024-05-02"));
    assert!(h.handler.pending(&session).await.unwrap().is_none());
    assert_eq!(h.store.work_log_count(), 0);
}

#[tokio::test]
async fn test_approve_without_staged_submission_is_not_found() {
    let h = harness();
    let session = SessionId::generate();
    for action in [StagedAction::Approve, StagedAction::Edit] {
        let err = h.handler.decide(&session, action).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

#[tokio::test]
async fn test_approve_creates_then_increments_single_pending_overage() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();
    persisted(&h, &session, &fx, 60).await;

    h.handler.submit(&session, fx.form(50)).await.unwrap();
    let (first_log, first) = match h
        .handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap()
    {
        DecisionOutcome::Persisted {
            work_log,
            overage: Some(record),
        } => (work_log, record),
        other => panic!("expected persisted overage, got {:?}", other),
    };
    assert!(matches!(first, OverageRecord::Created(_)));
    assert_eq!(first.overage().expected_units, 100);
    assert_eq!(first.overage().actual_units, 110);
    assert_eq!(first.overage().overage_units, 10);

    h.handler.submit(&session, fx.form(5)).await.unwrap();
    let second = match h
        .handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap()
    {
        DecisionOutcome::Persisted {
            overage: Some(record),
            ..
        } => record,
        other => panic!("expected persisted overage, got {:?}", other),
    };
    assert_eq!(
        second,
        OverageRecord::Updated {
            overage: second.overage().clone(),
            previous_units: 10
        }
    );
    assert_eq!(second.overage().id, first.overage().id);
    assert_eq!(second.overage().actual_units, 115);
    assert_eq!(second.overage().overage_units, 15);

    assert_eq!(h.store.work_log_count(), 3);
    assert_eq!(h.store.pending_count(fx.order.id, fx.process.id), 1);

    let contributions = h.store.all_contributions();
    assert_eq!(contributions.len(), 2);
    assert_eq!(contributions.iter().map(|c| c.units).sum::<i64>(), 15);
    assert!(
        contributions
            .iter()
            .any(|c| c.work_log_id == first_log.id && c.units == 10)
    );
}

#[tokio::test]
async fn test_new_overage_after_resolution() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 10).await;
    let session = SessionId::generate();
    let ledger = OverageLedger::new(h.store.factory(), TrailingWindow::days(30));

    h.handler.submit(&session, fx.form(12)).await.unwrap();
    h.handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap();
    let first = h.store.all_overages().pop().unwrap();
    ledger.resolve(&first.id, "admin", "accepted").await.unwrap();

    h.handler.submit(&session, fx.form(3)).await.unwrap();
    h.handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap();

    let overages = h.store.all_overages();
    assert_eq!(overages.len(), 2);
    let fresh = overages.iter().find(|o| o.id != first.id).unwrap();
    assert_eq!(fresh.status, OverageStatus::Pending);
    assert_eq!(fresh.actual_units, 15);
    assert_eq!(fresh.overage_units, 5);
    assert_eq!(
        h.store.overage(first.id).unwrap().status,
        OverageStatus::Resolved
    );
}

#[tokio::test]
async fn test_approval_reevaluates_against_current_totals() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();
    h.store.insert_raw_work_log(fx.work_log(95, "2024-05-01"));

    h.handler.submit(&session, fx.form(10)).await.unwrap();
    // 暂存期间另一条记录写入
    h.store.insert_raw_work_log(fx.work_log(20, "2024-05-01"));

    let record = match h
        .handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap()
    {
        DecisionOutcome::Persisted {
            overage: Some(record),
            ..
        } => record,
        other => panic!("expected overage, got {:?}", other),
    };
    assert_eq!(record.overage().actual_units, 125);
    assert_eq!(record.overage().overage_units, 25);
    // 本条只贡献自身数量
    assert_eq!(h.store.all_contributions()[0].units, 10);
}

#[tokio::test]
async fn test_failed_approval_rolls_back_and_restages() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 10).await;
    let session = SessionId::generate();
    h.handler.submit(&session, fx.form(12)).await.unwrap();

    h.store.fail_on("overages.add_contribution");
    let err = h
        .handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    assert_eq!(h.store.work_log_count(), 0);
    assert!(h.store.all_overages().is_empty());
    assert_eq!(h.store.order(fx.order.id).unwrap().status, OrderStatus::Pending);
    assert!(h.handler.pending(&session).await.unwrap().is_some());

    h.store.clear_failures();
    h.handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap();
    assert_eq!(h.store.work_log_count(), 1);
    assert_eq!(h.store.pending_count(fx.order.id, fx.process.id), 1);
}

#[tokio::test]
async fn test_failed_commit_writes_nothing() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    h.store.fail_on("commit");

    assert!(h.handler.submit(&SessionId::generate(), fx.form(5)).await.is_err());
    assert_eq!(h.store.work_log_count(), 0);
    assert_eq!(h.store.order(fx.order.id).unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_sessions_do_not_share_staged_submissions() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 10).await;
    let alice = SessionId::generate();
    let bob = SessionId::generate();

    h.handler.submit(&alice, fx.form(20)).await.unwrap();

    assert!(h.handler.pending(&bob).await.unwrap().is_none());
    let err = h
        .handler
        .decide(&bob, StagedAction::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(h.staging.peek(&alice).await.unwrap().is_some());
}

#[tokio::test]
async fn test_concurrent_submissions_are_serialized_by_order_lock() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    h.store.insert_raw_work_log(fx.work_log(90, "2024-05-01"));
    let (a, b) = (SessionId::generate(), SessionId::generate());

    let (first, second) = tokio::join!(
        h.handler.submit(&a, fx.form(8)),
        h.handler.submit(&b, fx.form(8))
    );

    let outcomes = [first.unwrap(), second.unwrap()];
    let persisted = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Persisted(_)))
        .count();
    let staged = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Staged(_)))
        .count();
    assert_eq!((persisted, staged), (1, 1));
    assert_eq!(h.store.work_log_count(), 2);
}

#[tokio::test]
async fn test_concurrent_approvals_keep_one_pending_overage() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    h.store.insert_raw_work_log(fx.work_log(90, "2024-05-01"));
    let (a, b) = (SessionId::generate(), SessionId::generate());
    h.handler.submit(&a, fx.form(20)).await.unwrap();
    h.handler.submit(&b, fx.form(20)).await.unwrap();

    let (first, second) = tokio::join!(
        h.handler.decide(&a, StagedAction::Approve),
        h.handler.decide(&b, StagedAction::Approve)
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(h.store.pending_count(fx.order.id, fx.process.id), 1);
    let overage = h.store.all_overages().pop().unwrap();
    assert_eq!(overage.actual_units, 130);
    assert_eq!(overage.overage_units, 30);
    let attributed: i64 = h.store.all_contributions().iter().map(|c| c.units).sum();
    assert_eq!(attributed, 30);
}

#[tokio::test]
async fn test_edit_warns_without_touching_overages() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();
    let log = persisted(&h, &session, &fx, 60).await;
    persisted(&h, &session, &fx, 30).await;

    let outcome = h.handler.edit(&log.id, fx.form(80)).await.unwrap();

    match outcome {
        EditOutcome::Updated { work_log, warning } => {
            assert_eq!(work_log.quantity, 80);
            let warning = warning.unwrap();
            assert!(warning.contains("30 already logged + 80 proposed = 110"));
        }
        other => panic!("expected update, got {:?}", other),
    }
    assert!(h.store.all_overages().is_empty());
    assert!(h.handler.pending(&session).await.unwrap().is_none());
}

#[tokio::test]
async fn test_edit_excludes_own_quantity() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let session = SessionId::generate();
    let log = persisted(&h, &session, &fx, 100).await;

    match h.handler.edit(&log.id, fx.form(100)).await.unwrap() {
        EditOutcome::Updated { warning, .. } => assert!(warning.is_none()),
        other => panic!("expected update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_edit_rejects_invalid_form() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let log = persisted(&h, &SessionId::generate(), &fx, 10).await;
    let form = WorkLogForm {
        work_date: Some("yesterday".to_string()),
        ..fx.form(10)
    };

    let outcome = h.handler.edit(&log.id, form).await.unwrap();
    assert!(matches!(outcome, EditOutcome::Rejected { .. }));
    assert_eq!(h.handler.get(&log.id).await.unwrap(), log);
}

#[tokio::test]
async fn test_delete_removes_contributions() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 10).await;
    let session = SessionId::generate();
    h.handler.submit(&session, fx.form(12)).await.unwrap();
    let log = match h
        .handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap()
    {
        DecisionOutcome::Persisted { work_log, .. } => work_log,
        other => panic!("expected persisted, got {:?}", other),
    };

    h.handler.delete(&log.id).await.unwrap();

    assert_eq!(h.store.work_log_count(), 0);
    assert!(h.store.all_contributions().is_empty());
    // 超产记录保留，等待人工处理
    assert_eq!(h.store.pending_count(fx.order.id, fx.process.id), 1);
    assert!(matches!(
        h.handler.delete(&log.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_list_filters_and_paginates() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 1000).await;
    let other = Fixture::seed(&h.store, 1000).await;
    let session = SessionId::generate();
    for _ in 0..3 {
        persisted(&h, &session, &fx, 1).await;
    }
    persisted(&h, &session, &other, 1).await;

    let filter = WorkLogFilter {
        order_id: Some(fx.order.id),
        ..Default::default()
    };
    let page = h
        .handler
        .list(&filter, &Pagination::new(1, 2))
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|l| l.order_id == fx.order.id));
}

#[tokio::test]
async fn test_end_to_end_overage_approval_and_resolution() {
    let h = harness();
    let fx = Fixture::seed(&h.store, 100).await;
    let ledger = OverageLedger::new(h.store.factory(), TrailingWindow::days(30));
    let session = SessionId::generate();

    persisted(&h, &session, &fx, 60).await;
    assert!(matches!(
        h.handler.submit(&session, fx.form(50)).await.unwrap(),
        SubmitOutcome::Staged(_)
    ));
    h.handler
        .decide(&session, StagedAction::Approve)
        .await
        .unwrap();

    let dashboard = ledger.dashboard().await.unwrap();
    assert_eq!(dashboard.pending.len(), 1);
    let pending = &dashboard.pending[0].overage;
    assert_eq!(
        (pending.expected_units, pending.actual_units, pending.overage_units),
        (100, 110, 10)
    );
    assert_eq!(dashboard.pending[0].order_no.as_deref(), Some(fx.order.order_no.as_str()));

    let resolved = ledger
        .resolve(&pending.id, "admin", "approved rework")
        .await
        .unwrap();
    assert_eq!(resolved.resolution_notes.as_deref(), Some("approved rework"));

    let dashboard = ledger.dashboard().await.unwrap();
    assert!(dashboard.pending.is_empty());
    assert_eq!(dashboard.recently_resolved.len(), 1);
    assert_eq!(h.store.work_log_count(), 2);
}
