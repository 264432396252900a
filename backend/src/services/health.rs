use crate::services::fulfillment::state::FulfillmentState;
use actix_web::{web, HttpResponse, Responder};

/// `GET /`
pub async fn process(state: web::Data<FulfillmentState>) -> impl Responder {
    let backers_loaded = state.directory.read().await.len();
    let results = state.ledger.read().await.len();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "backers_loaded": backers_loaded,
        "results": results,
        "batch_running": state.is_running(),
        "catalog_entries": state.catalog.entry_count(),
        "dry_run": state.config.dry_run,
    }))
}
