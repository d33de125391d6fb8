use agent_workspace::{Executor, RetryPolicy, WorkspaceError};
use errors::RemoteError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(1000),
        jitter_ratio: 0.1
    }
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_between_attempts() {
    let executor = Executor::new(policy());
    let seen: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let err = executor
        .run("values.get", || {
            let seen = seen.clone();
            async move {
                seen.lock().push(Instant::now());
                Err::<(), _>(RemoteError::status(503, "backend unavailable"))
            }
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkspaceError::Remote(RemoteError::Status { code: 503, .. })
    ));

    let seen = seen.lock();
    assert_eq!(seen.len(), 5);
    let gaps: Vec<Duration> = seen.windows(2).map(|w| w[1] - w[0]).collect();
    for (attempt, gap) in gaps.iter().enumerate() {
        let floor = executor.policy().capped_delay(attempt as u32);
        assert!(*gap >= floor, "gap {attempt} was {gap:?}, expected at least {floor:?}");
        assert!(
            *gap <= floor.mul_f64(1.1),
            "gap {attempt} was {gap:?}, jitter above 10%"
        );
    }
    for pair in gaps.windows(2) {
        assert!(pair[1] >= pair[0], "gaps must not shrink: {gaps:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_sleeps() {
    let executor = Executor::new(RetryPolicy {
        max_attempts: 1,
        ..policy()
    });
    let started = Instant::now();

    let err = executor
        .run("values.get", || async {
            Err::<(), _>(RemoteError::transport("ETIMEDOUT", "timed out"))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WorkspaceError::Network { attempts: 1, .. }));
    assert_eq!(started.elapsed(), Duration::ZERO);
}
