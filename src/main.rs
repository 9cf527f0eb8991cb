//! cprf-audit CLI - CPRF data-quality audit
//!
//! Command-line interface for the audit pipeline.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

fn main() -> ExitCode {
    cprf_audit::cli::run()
}
