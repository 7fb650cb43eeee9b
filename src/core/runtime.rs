//! Process-wide async runtime setup.
//!
//! The policy is chosen once, before any future is scheduled, and every
//! runtime built afterwards uses it. The platform condition is passed in by
//! the caller rather than detected here.

use std::future::Future;
use std::io;
use std::sync::OnceLock;
use std::time::Duration;

static POLICY: OnceLock<RuntimePolicy> = OnceLock::new();

/// Keep-alive for blocking-pool threads under [`RuntimePolicy::SubprocessPipes`].
const SUBPROCESS_THREAD_KEEP_ALIVE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimePolicy {
    Default,
    /// Child stdio is relayed through the blocking pool, so its threads are
    /// kept alive for the lifetime of long-running servers.
    SubprocessPipes,
}

/// Selects the runtime policy for this process. Only the first call has any
/// effect; returns `true` when this call installed the policy.
pub fn configure_event_loop(apply_subprocess_policy: bool) -> bool {
    let policy = if apply_subprocess_policy {
        RuntimePolicy::SubprocessPipes
    } else {
        RuntimePolicy::Default
    };
    let installed = POLICY.set(policy).is_ok();
    if installed {
        tracing::debug!(?policy, "Configured event loop policy");
    }
    installed
}

pub fn current_policy() -> RuntimePolicy {
    POLICY.get().copied().unwrap_or(RuntimePolicy::Default)
}

/// Builds the single-threaded runtime that hosts the whole chat session.
pub fn build_runtime() -> io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_current_thread();
    builder.enable_all();
    if current_policy() == RuntimePolicy::SubprocessPipes {
        builder.thread_keep_alive(SUBPROCESS_THREAD_KEEP_ALIVE);
    }
    builder.build()
}

/// Drives `future` to completion, then shuts the runtime down without
/// waiting on the blocking pool. A pending stdin read lives on that pool and
/// never finishes on its own, so a normal drop would hang the process.
pub fn run_to_completion<F: Future>(runtime: tokio::runtime::Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    // The policy is process-global, so every assertion about it lives in one
    // test to avoid ordering between parallel tests.
    #[test]
    fn configuration_applies_at_most_once() {
        let first = configure_event_loop(true);
        let second = configure_event_loop(false);

        assert!(first, "first call installs the policy");
        assert!(!second, "later calls are ignored");
        assert_eq!(current_policy(), RuntimePolicy::SubprocessPipes);

        let runtime = build_runtime().expect("runtime builds");
        let value = runtime.block_on(async { 21 * 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn finishing_does_not_wait_for_stuck_blocking_reads() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let started = std::time::Instant::now();

        let value = run_to_completion(runtime, async move {
            tokio::task::spawn_blocking(move || {
                let _ = started_tx.send(());
                std::thread::sleep(Duration::from_secs(30));
            });
            tokio::task::spawn_blocking(move || started_rx.recv())
                .await
                .unwrap()
                .unwrap();
            "done"
        });

        assert_eq!(value, "done");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
