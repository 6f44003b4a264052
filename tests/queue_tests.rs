//! Queue manager tests: admission, ordering, cancellation, and shutdown.

mod test_harness;

use std::sync::Arc;
use std::time::Duration;

use botvisor::{
    Bus, CancelError, Config, EventKind, JobOutcome, JobRequest, QueueError, QueueManager,
    SubmitError, TierPolicy,
};
use test_harness::{drain, wait_for_kind};

fn manager(cfg: &Config) -> (Arc<QueueManager>, Bus) {
    let bus = Bus::new(64);
    let qm = QueueManager::new(cfg, TierPolicy::default(), bus.clone());
    (qm, bus)
}

fn worker(name: &str) -> Arc<str> {
    Arc::from(name)
}

#[tokio::test]
async fn higher_tier_claims_first_fifo_within_tier() {
    let (qm, _bus) = manager(&Config::default());

    let a = JobRequest::new("alice", "noop", vec![]).with_tier(1);
    let b = JobRequest::new("bob", "noop", vec![]).with_tier(2);
    let c = JobRequest::new("carol", "noop", vec![]).with_tier(1);
    let (ida, idb, idc) = (a.id, b.id, c.id);

    qm.submit(a).await.unwrap();
    qm.submit(b).await.unwrap();
    qm.submit(c).await.unwrap();

    let w = worker("bot-1");
    let first = qm.claim_next(&w).await.unwrap();
    let second = qm.claim_next(&w).await.unwrap();
    let third = qm.claim_next(&w).await.unwrap();

    assert_eq!(first.job.id, idb, "tier 2 jumps ahead");
    assert_eq!(second.job.id, ida, "tier 1 in submit order");
    assert_eq!(third.job.id, idc);
}

#[tokio::test]
async fn owner_cap_holds_until_terminal_outcome() {
    let (qm, _bus) = manager(&Config::default()); // owner_cap = 1

    let first = JobRequest::new("alice", "noop", vec![]);
    let first_id = first.id;
    qm.submit(first).await.unwrap();

    let err = qm
        .submit(JobRequest::new("alice", "noop", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::DuplicateOwner { cap: 1, .. }));

    // A different owner is unaffected.
    qm.submit(JobRequest::new("bob", "noop", vec![])).await.unwrap();

    // Claiming does not release the slot...
    let w = worker("bot-1");
    let claimed = qm.claim_next(&w).await.unwrap();
    assert_eq!(claimed.job.id, first_id);
    assert!(matches!(
        qm.submit(JobRequest::new("alice", "noop", vec![])).await,
        Err(SubmitError::DuplicateOwner { .. })
    ));

    // ...the terminal outcome does.
    qm.report_outcome(first_id, JobOutcome::Completed(None)).await;
    qm.submit(JobRequest::new("alice", "noop", vec![]))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn owner_cap_holds_under_concurrent_submits() {
    let (qm, _bus) = manager(&Config::default()); // owner_cap = 1

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let qm = Arc::clone(&qm);
            tokio::spawn(async move { qm.submit(JobRequest::new("alice", "noop", vec![])).await })
        })
        .collect();

    let mut admitted = 0;
    let mut capped = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(SubmitError::DuplicateOwner { .. }) => capped += 1,
            Err(e) => panic!("unexpected rejection: {e}"),
        }
    }

    assert_eq!(admitted, 1, "exactly one submit wins the owner slot");
    assert_eq!(capped, 15);
    assert_eq!(qm.list().await.len(), 1);
}

#[tokio::test]
async fn duplicate_job_id_rejected() {
    let (qm, _bus) = manager(&Config::default());

    let job = JobRequest::new("alice", "noop", vec![]);
    let dup = job.clone();
    qm.submit(job).await.unwrap();

    assert!(matches!(
        qm.submit(dup).await,
        Err(SubmitError::DuplicateJob { .. })
    ));
}

#[tokio::test]
async fn empty_owner_rejected() {
    let (qm, _bus) = manager(&Config::default());
    assert!(matches!(
        qm.submit(JobRequest::new("", "noop", vec![])).await,
        Err(SubmitError::Invalid { .. })
    ));
}

#[tokio::test]
async fn cancel_pending_reorders_queue() {
    let mut cfg = Config::default();
    cfg.owner_cap = 4;
    let (qm, bus) = manager(&cfg);
    let mut rx = bus.subscribe();

    let a = JobRequest::new("alice", "noop", vec![]);
    let b = JobRequest::new("alice", "noop", vec![]);
    let c = JobRequest::new("alice", "noop", vec![]);
    let (ida, idb, idc) = (a.id, b.id, c.id);
    qm.submit(a).await.unwrap();
    qm.submit(b).await.unwrap();
    qm.submit(c).await.unwrap();

    assert_eq!(qm.position_of(idb).await, Some(2));
    qm.cancel(ida, "alice").await.unwrap();
    assert_eq!(qm.position_of(idb).await, Some(1));
    assert_eq!(qm.position_of(idc).await, Some(2));
    assert_eq!(qm.position_of(ida).await, None);

    let ev = wait_for_kind(&mut rx, EventKind::Cancelled, Duration::from_secs(1)).await;
    assert_eq!(ev.job, Some(ida));
}

#[tokio::test]
async fn cancel_authorization_and_unknown_ids() {
    let (qm, _bus) = manager(&Config::default());

    let job = JobRequest::new("alice", "noop", vec![]);
    let id = job.id;
    qm.submit(job).await.unwrap();

    assert!(matches!(
        qm.cancel(id, "mallory").await,
        Err(CancelError::NotPermitted { .. })
    ));
    assert!(matches!(
        qm.cancel(botvisor::JobId::new_v4(), "alice").await,
        Err(CancelError::NotFound { .. })
    ));
    qm.cancel(id, "alice").await.unwrap();
}

#[tokio::test]
async fn cancel_claimed_respects_cancellable_flag() {
    let mut cfg = Config::default();
    cfg.owner_cap = 2;
    let (qm, _bus) = manager(&cfg);
    let w = worker("bot-1");

    let locked = JobRequest::new("alice", "noop", vec![]).with_cancellable(false);
    let locked_id = locked.id;
    qm.submit(locked).await.unwrap();
    qm.claim_next(&w).await.unwrap();

    assert!(matches!(
        qm.cancel(locked_id, "alice").await,
        Err(CancelError::NotCancellable { .. })
    ));

    let soft = JobRequest::new("alice", "noop", vec![]);
    let soft_id = soft.id;
    qm.submit(soft).await.unwrap();
    let claimed = qm.claim_next(&w).await.unwrap();
    assert!(!claimed.cancel.is_cancelled());

    qm.cancel(soft_id, "alice").await.unwrap();
    assert!(claimed.cancel.is_cancelled(), "claimed cancel is a signal");
}

#[tokio::test]
async fn claim_suspends_until_submit() {
    let (qm, _bus) = manager(&Config::default());

    let waiter = {
        let qm = Arc::clone(&qm);
        tokio::spawn(async move { qm.claim_next(&worker("bot-1")).await })
    };
    tokio::task::yield_now().await;

    let job = JobRequest::new("alice", "noop", vec![]);
    let id = job.id;
    qm.submit(job).await.unwrap();

    let claimed = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("claimer should wake")
        .unwrap()
        .unwrap();
    assert_eq!(claimed.job.id, id);
}

#[tokio::test]
async fn shutdown_unblocks_claimers_and_rejects_submits() {
    let (qm, _bus) = manager(&Config::default());

    let waiter = {
        let qm = Arc::clone(&qm);
        tokio::spawn(async move { qm.claim_next(&worker("bot-1")).await })
    };
    tokio::task::yield_now().await;

    qm.shutdown();
    let res = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("claimer should wake on shutdown")
        .unwrap();
    assert!(matches!(res, Err(QueueError::Shutdown)));

    assert!(matches!(
        qm.submit(JobRequest::new("alice", "noop", vec![])).await,
        Err(SubmitError::Shutdown)
    ));
}

#[tokio::test]
async fn terminal_event_published_exactly_once() {
    let (qm, bus) = manager(&Config::default());
    let mut rx = bus.subscribe();

    let job = JobRequest::new("alice", "noop", vec![]);
    let id = job.id;
    qm.submit(job).await.unwrap();
    qm.claim_next(&worker("bot-1")).await.unwrap();

    qm.report_outcome(id, JobOutcome::Completed(Some(b"r".to_vec())))
        .await;
    // A duplicate report (late worker) must not publish a second terminal.
    qm.report_outcome(id, JobOutcome::Failed(botvisor::FailureReason::Behavior {
        detail: "late".into(),
    }))
    .await;

    let events = drain(&mut rx);
    let terminals: Vec<_> = events
        .iter()
        .filter(|e| e.kind.is_terminal() && e.job == Some(id))
        .collect();
    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0].kind, EventKind::Completed);
}

#[tokio::test]
async fn list_reports_priority_order_positions() {
    let mut cfg = Config::default();
    cfg.owner_cap = 4;
    let (qm, _bus) = manager(&cfg);

    let low = JobRequest::new("alice", "noop", vec![]).with_tier(0);
    let high = JobRequest::new("alice", "noop", vec![]).with_tier(3);
    let (low_id, high_id) = (low.id, high.id);
    qm.submit(low).await.unwrap();
    qm.submit(high).await.unwrap();

    let listing = qm.list().await;
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].id, high_id);
    assert_eq!(listing[0].position, 1);
    assert_eq!(listing[1].id, low_id);
    assert_eq!(listing[1].position, 2);
    assert_eq!(qm.pending().await, 2);
    assert_eq!(qm.in_flight().await, 0);
}
