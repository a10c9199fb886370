use contesto_core::AppConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    contesto_api::init_telemetry();

    let config = AppConfig::from_env()?;

    let (_state, router) = contesto_api::setup::initialize_app(config.clone()).await?;

    contesto_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
