use cinemateket::{FetcherConfig, ProgramFetcher};
use cinemateket_web::{AppState, ServiceConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Never)
        .init();

    let config = ServiceConfig::from_env();

    let fetcher = ProgramFetcher::with_config(FetcherConfig {
        base_url: config.base_url.clone(),
        ..Default::default()
    })
    .inspect_err(|e| log::error!("Failed to build fetcher: {e:?}"))?;

    let tcp_listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    log::info!(
        "Starting programme server on address: {} (source: {})",
        config.bind_address,
        config.base_url
    );

    axum::serve(tcp_listener, router(AppState::new(fetcher)))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("Shutting down");
        })
        .await?;

    Ok(())
}
