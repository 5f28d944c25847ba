use tracing_subscriber::{fmt, EnvFilter};

fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}

/// Install a human-readable subscriber for interactive runs.
///
/// `RUST_LOG` wins when set; otherwise `default_directives` applies
/// (e.g. "info" or "ft_triage=debug,warn"). Calling this more than
/// once is a no-op, so test binaries may call it freely.
pub fn init_logging(service_name: &str, default_directives: &str) {
    fmt()
        .with_env_filter(env_filter(default_directives))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .ok();

    tracing::info!(service = service_name, "logging initialised");
}

/// Install a JSON-lines subscriber for runs whose output feeds a log
/// shipper. Same filter and idempotency rules as [`init_logging`].
pub fn init_logging_json(service_name: &str, default_directives: &str) {
    fmt()
        .json()
        .with_env_filter(env_filter(default_directives))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .ok();

    tracing::info!(service = service_name, "logging initialised (json)");
}
