//! Job status polling for fulfillment batches.

use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};

/// `GET /api/fulfillment/status/{job_id}`
pub(crate) async fn process(jobs: web::Data<JobsState>, path: web::Path<String>) -> impl Responder {
    let job_id = path.into_inner();
    match jobs.status(&job_id).await {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().json(serde_json::json!({ "error": format!("unknown job {}", job_id) })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use common::jobs::JobStatus;

    #[actix_web::test]
    async fn test_status_of_known_and_unknown_jobs() {
        let (jobs, _rx) = JobsState::new(8);
        jobs.register("job-1").await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(jobs))
                .route("/status/{job_id}", web::get().to(process)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/status/job-1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let status: JobStatus = test::read_body_json(resp).await;
        assert_eq!(status, JobStatus::Pending);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/status/job-2").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
