//! Shared helpers for jobloop's integration tests.

pub mod builders;
pub mod fake_driver;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use jobloop::engine::SchedulerOptions;
use jobloop::logging::{log_filter, LOG_ENV};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Upper bound for a single scheduler run in tests. Fake jobs finish in a few
/// poll sweeps; real ones are `sh -c "exit N"`.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval used by [`fast_options`].
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Install a test-writer subscriber once per test binary.
///
/// Reads the same `JOBLOOP_LOG` directives as the binary, so
/// `JOBLOOP_LOG=jobloop::engine=debug cargo test -- --nocapture` shows every
/// dispatch and collect. Without it only warnings are printed.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = match std::env::var(LOG_ENV) {
            Ok(value) => log_filter(None, Some(&value)).unwrap_or_else(|_| EnvFilter::new("warn")),
            Err(_) => EnvFilter::new("warn"),
        };

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Scheduler options for fake drivers: a fixed 1ms poll interval and `jobs`
/// slots.
pub fn fast_options(jobs: usize) -> SchedulerOptions {
    SchedulerOptions {
        jobs,
        poll_interval: TEST_POLL_INTERVAL,
        dynamic_poll_interval: false,
        ..SchedulerOptions::default()
    }
}

/// Run `f`, failing the test if it outlives [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("scheduler run did not finish within {:?}", TEST_TIMEOUT))
}
