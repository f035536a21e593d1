#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use estimate_tool::{config::AppConfig, http_api, logging};

    let config = AppConfig::from_env()?;
    if let Err(err) = logging::init(&config.log_filter) {
        eprintln!("logging disabled: {err}");
    }

    let session = config.open_session()?;
    tracing::info!(store = %config.store, "project session ready");

    println!(
        "estimate-tool HTTP API listening on http://{}",
        config.http_addr
    );
    http_api::serve(config.http_addr, session).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
