#![allow(dead_code, unused_imports)]

pub use jobloop_test_utils::builders;
pub use jobloop_test_utils::fake_driver::{DriverEvent, FakeDriver};
pub use jobloop_test_utils::{fast_options, init_tracing, with_timeout};
