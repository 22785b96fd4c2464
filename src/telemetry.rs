//! Tracing setup.
//!
//! `LOG_LEVEL` takes an env-filter directive (`info`, `aiquizbot=debug,teloxide=info`, ...).
//! `LOG_FORMAT=json` switches to JSON lines. Records emitted through `log`
//! (teloxide uses it) are forwarded into tracing.

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

const DEFAULT_FILTER: &str = "info";

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false);

    let installed = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing::subscriber::set_global_default(builder.json().finish()),
        _ => tracing::subscriber::set_global_default(builder.finish()),
    };
    if let Err(e) = installed {
        eprintln!("tracing subscriber already installed: {e}");
    }

    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::warn!(error = %e, "log records will not be captured");
    }
}
