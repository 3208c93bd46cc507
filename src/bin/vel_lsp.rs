#![deny(clippy::all, clippy::perf, clippy::suspicious)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

use std::process::ExitCode;

use vel::logging::{init_logging, LogOptions};
use vel::lsp;

fn main() -> ExitCode {
    init_logging(&LogOptions::from_env());
    if let Err(err) = lsp::run_stdio(lsp::capabilities()) {
        eprintln!("vel-lsp failed: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
