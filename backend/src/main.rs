mod config;
mod engine;
mod errors;
mod job_controller;
mod services;

use crate::config::AppConfig;
use crate::engine::CatalogTable;
use crate::job_controller::state::JobsState;
use crate::services::commerce::{CommerceClient, InMemoryCommerce, ShopifyClient};
use crate::services::fulfillment::state::FulfillmentState;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::other(e)
    })?;

    // A broken catalog aborts start-up before any backer can be processed.
    let catalog = CatalogTable::load(&config.catalog_path).map_err(|e| {
        error!("Catalog {} rejected: {}", config.catalog_path.display(), e);
        io::Error::other(e)
    })?;
    info!(
        "Loaded catalog {} ({} entries, {} combination rules)",
        config.catalog_path.display(),
        catalog.entry_count(),
        catalog.combinations().len()
    );
    let catalog = Arc::new(catalog);

    let client: Arc<dyn CommerceClient> = match &config.shopify {
        Some(shopify) if !config.dry_run => {
            info!("Using Shopify store {} (API {})", shopify.shop, shopify.api_version);
            Arc::new(
                ShopifyClient::new(shopify, config.pipeline.call_timeout).map_err(io::Error::other)?,
            )
        }
        _ => {
            warn!("DRY_RUN: customers and discounts are kept in memory only");
            Arc::new(InMemoryCommerce::with_catalog(&catalog))
        }
    };

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new(100);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let host = config.host.clone();
    let port = config.port;
    let fulfillment_state = web::Data::new(FulfillmentState::new(config, catalog, client));
    let jobs_state = web::Data::new(jobs_state);

    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(jobs_state.clone())
            .app_data(fulfillment_state.clone())
            .route("/", web::get().to(services::health::process))
            .service(services::data_sources::csv::configure_routes())
            .service(services::fulfillment::configure_routes())
            .service(services::fulfillment::customer_resource())
            .service(services::fulfillment::landing_resource())
            .service(services::catalog::configure_routes())
            .service(services::catalog::store_products_resource())
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
