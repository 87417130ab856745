//! Log-based observability for the prediction job
//!
//! The job runs to completion and exits, so everything it reports goes out as
//! log lines on stderr: pretty for terminals, JSON for log collectors.

pub mod logging;

pub use logging::init_logging;
