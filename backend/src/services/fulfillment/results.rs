//! Read and export access to the result ledger.

use crate::services::fulfillment::export::write_export;
use crate::services::fulfillment::state::FulfillmentState;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::error;

/// `GET /api/fulfillment/results`
pub(crate) async fn process(state: web::Data<FulfillmentState>) -> impl Responder {
    let ledger = state.ledger.read().await;
    HttpResponse::Ok().json(serde_json::json!({
        "summary": ledger.summary(),
        "results": ledger.results(),
    }))
}

/// `POST /api/fulfillment/export`
pub(crate) async fn export(state: web::Data<FulfillmentState>) -> impl Responder {
    let results = state.ledger.read().await.results().to_vec();
    let results_dir = state.config.results_dir.clone();

    match tokio::task::spawn_blocking(move || write_export(&results, &results_dir, Utc::now())).await {
        Ok(Ok(paths)) => HttpResponse::Ok().json(paths),
        Ok(Err(e)) => {
            error!("Export failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
        Err(e) => HttpResponse::InternalServerError().body(format!("Task join error: {}", e)),
    }
}
