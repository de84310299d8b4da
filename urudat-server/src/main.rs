use std::sync::Arc;

use anyhow::{Context, Result};
use ckan::CatalogClient;
use env_logger::Env;

use urudat_server::{config::EnvVars, router::app_router, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let env = EnvVars::from_env().context("failed to read environment")?;
    log::info!("Environment: {:?}", &env);

    let catalog = CatalogClient::new(env.catalog_config()).context("failed to build catalog client")?;
    log::info!("Proxying catalog at {}", catalog.base_url());

    let app = app_router().with_state(AppState::new(Arc::new(catalog)));

    let listen_addr = env.listen_addr();
    log::info!("Listening on {}", &listen_addr);
    axum::Server::bind(&listen_addr)
        .serve(app.into_make_service())
        .await
        .context("failed to start axum server")?;

    Ok(())
}
