//! Batch fulfillment: backer directory, pipeline, ledger, export and the
//! HTTP routes that drive them.

pub mod customer;
pub mod directory;
pub mod export;
mod get_status;
pub mod ledger;
pub mod links;
pub mod pipeline;
mod results;
mod start;
pub mod state;

use actix_web::web;

const API_PATH: &str = "/api/fulfillment";

/// Configures and returns the Actix `Scope` for the batch routes.
pub fn configure_routes() -> actix_web::Scope {
    web::scope(API_PATH)
        .route("/process", web::post().to(start::process))
        .route("/cancel", web::post().to(start::cancel))
        .route("/status/{job_id}", web::get().to(get_status::process))
        .route("/results", web::get().to(results::process))
        .route("/export", web::post().to(results::export))
}

/// Backer landing-page data, addressed by token.
pub fn customer_resource() -> actix_web::Resource {
    web::resource("/api/customer/{token}").route(web::get().to(customer::process))
}

/// Target of the `landing_page_url` handed to backers. Serves the same view as
/// [`customer_resource`].
pub fn landing_resource() -> actix_web::Resource {
    web::resource("/fulfillment/{token}").route(web::get().to(customer::process))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fulfillment::customer::tests::fulfilled_state;
    use crate::services::fulfillment::links::encode_token;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_landing_page_url_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = fulfilled_state(dir.path()).await;
        let url = state.ledger.read().await.results()[0]
            .success()
            .unwrap()
            .landing_page_url
            .clone();
        let path = url
            .strip_prefix(state.config.pipeline.base_url.as_str())
            .unwrap()
            .to_string();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(landing_resource())
                .service(customer_resource()),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri(&path).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(view["name"], "Ada Lovelace");

        let stale = format!("/fulfillment/{}", encode_token("5001", "KS17_000000000"));
        let resp = test::call_service(&app, test::TestRequest::get().uri(&stale).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
