use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    /// JSON lines, for running under a log collector.
    Json,
}

/// Human-readable logs on stderr; stdout is kept for command output.
pub fn init_cli_logger(verbose: bool) {
    init(LogFormat::Compact, verbose);
}

pub fn init_json_logger() {
    init(LogFormat::Json, false);
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "rss_client=debug,info"
    } else {
        "rss_client=info"
    }
}

/// `RUST_LOG` wins over the built-in directives.
pub fn init(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => registry.with(layer.compact()).init(),
        LogFormat::Json => registry.with(layer.json()).init(),
    }
}
