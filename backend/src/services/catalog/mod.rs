//! Read-only views of the catalog table and the storefront.

use crate::services::fulfillment::state::FulfillmentState;
use actix_web::{web, HttpResponse, Responder};
use log::error;

const API_PATH: &str = "/api/catalog";

pub fn configure_routes() -> actix_web::Scope {
    web::scope(API_PATH).route("/mapping", web::get().to(mapping))
}

pub fn store_products_resource() -> actix_web::Resource {
    web::resource("/api/store-products").route(web::get().to(store_products))
}

/// `GET /api/catalog/mapping`
async fn mapping(state: web::Data<FulfillmentState>) -> impl Responder {
    HttpResponse::Ok().json(state.catalog.document())
}

/// `GET /api/store-products`
async fn store_products(state: web::Data<FulfillmentState>) -> impl Responder {
    match state.client.list_products().await {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => {
            error!("Could not list store products: {}", e);
            HttpResponse::BadGateway().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}
