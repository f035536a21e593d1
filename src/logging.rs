use std::error::Error;

/// Installs a stderr `fmt` subscriber filtered by `directives` (e.g. `info,estimate_core=debug`).
pub fn init(directives: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = tracing_subscriber::EnvFilter::try_new(directives)
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(crate::config::DEFAULT_LOG_FILTER))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}
