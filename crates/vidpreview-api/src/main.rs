use vidpreview_core::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = ServerConfig::from_env()?;

    vidpreview_api::telemetry::init_telemetry(config.log_json || config.is_production())?;

    let (state, router) = vidpreview_api::setup::initialize_app(&config).await?;

    vidpreview_api::setup::server::start_server(&config, router).await?;

    state.queue.shutdown().await;
    vidpreview_api::telemetry::shutdown_telemetry().await;

    Ok(())
}
