use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_FILTER: &str = "info,kube=warn,tower=warn,hyper=warn";

/// Initialize tracing
///
/// Logs go to stderr, stdout is reserved for the documents the binaries print.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let logger = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(logger).with(filter).init();
}
