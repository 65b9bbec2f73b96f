use callme_dashboard::{
    app,
    config::{ConfigProvider, EnvVarProvider},
    InjectableServices,
};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let env_config_provider = EnvVarProvider::new(env::vars().collect())?;
    let config = env_config_provider.get_config();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    log::info!("Dashboard listening on {}", listener.local_addr()?);

    axum::serve(listener, app(InjectableServices::default()).await?).await?;

    Ok(())
}
