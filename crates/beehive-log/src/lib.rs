//! Logging for the beehive thread pool.
//!
//! This crate does not install a logger; it only re-exports the `log` crate
//! macros so that every other `beehive` crate logs through one path. Host
//! applications are free to wire up `env_logger`, `tracing-log`, or any
//! other `log` backend.

pub use log::{debug, error, info, trace, warn};

/// Runs `$expression`, logging its wall-clock duration at `trace` level.
#[macro_export]
macro_rules! with_trace_timing {
    ($message:expr $(,$arg:expr)*; $expression:expr) => {{
        $crate::trace!(concat!("begin: ", $message)$(,$arg)*);
        let _start = ::std::time::Instant::now();
        let _result = $expression;
        let _elapsed = _start.elapsed();
        $crate::trace!(
            concat!("done ({:.2} ms): ", $message),
            _elapsed.as_secs_f64() * 1e3
            $(,$arg)*
        );
        _result
    }};
}
