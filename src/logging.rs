use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PIXMUSE_LOG";

/// Installs the fmt subscriber on stderr, filtered by `PIXMUSE_LOG`.
///
/// `verbose` lowers the fallback level to `debug` when the variable is unset.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
