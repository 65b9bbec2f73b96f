pub mod api;
pub mod config;
pub mod debounce;
pub mod format;
pub mod models;
pub mod query_cache;
pub mod routes;
pub mod theme;
pub mod timezones;
pub mod validation;
pub mod views;

use crate::{
    api::RemindersApi,
    config::{Config, ConfigError, ConfigProvider, EnvVarProvider},
    query_cache::QueryCache,
    routes::*,
};

use axum::{
    routing::{get, post},
    Router,
};
use axum_template::engine::Engine;
use handlebars::{DirectorySourceOptions, Handlebars};
use std::env;
use thiserror::Error;
use tower_http::services::ServeDir;
use url::Url;

pub type AppEngine = Engine<Handlebars<'static>>;

#[derive(Clone)]
pub struct AppState {
    pub engine: AppEngine,
    pub cache: QueryCache,
    pub config: Config,
}

#[derive(Clone, Debug, Default)]
pub struct InjectableServices {
    pub reminders_api_address: Option<String>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid reminders API address: {0}")]
    ApiAddress(#[from] url::ParseError),

    #[error("Failed to register templates: {0}")]
    Templates(#[from] handlebars::TemplateError),
}

pub async fn app(services: InjectableServices) -> Result<Router, StartupError> {
    let env_config_provider = EnvVarProvider::new(env::vars().collect())?;
    let mut config = env_config_provider.get_config().clone();

    if let Some(address) = services.reminders_api_address {
        config.reminders_api_url = Url::parse(&address)?;
    }

    let mut hbs = Handlebars::new();
    hbs.register_templates_directory(
        "templates",
        DirectorySourceOptions {
            tpl_extension: ".hbs".to_string(),
            hidden: false,
            temporary: false,
        },
    )?;

    log::info!(
        "Using reminders API at {} (stale after {:?})",
        config.reminders_api_url,
        config.query_stale_time
    );

    let cache = QueryCache::new(
        RemindersApi::new(config.reminders_api_url.clone()),
        config.query_stale_time,
    );

    let router = Router::new()
        .route("/", get(get_dashboard))
        .route("/live", get(get_live))
        .route("/reminders", post(post_reminder))
        .route("/reminders/new", get(get_new_reminder))
        .route("/reminders/validate", post(post_validate))
        .route("/reminders/:id", post(post_update_reminder))
        .route("/reminders/:id/edit", get(get_edit_reminder))
        .route(
            "/reminders/:id/delete",
            get(get_delete_reminder).post(post_delete_reminder),
        )
        .route("/theme", post(post_theme))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(AppState {
            engine: Engine::from(hbs),
            cache,
            config,
        });

    Ok(router)
}
