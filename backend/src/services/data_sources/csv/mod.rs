//! Pledge export handling: header verification, row loading and uploads.
//!
//! The provided route is:
//! - `POST /api/data_sources/csv/upload`: Handles multipart/form-data uploads with a `file`
//!   field holding the campaign export. The header is verified against the catalog column
//!   table and the file is saved under the upload directory with a name derived from its
//!   MD5 hash. The response lists the recognised quantity columns so the operator can spot
//!   product columns the catalog does not know about before starting a run.
//!
//! Loading (`load`) is used by the fulfillment batch to turn the stored file into
//! `RawPledgeRow`s.

use actix_web::web::{post, scope};
use actix_web::Scope;

pub mod load;
mod upload;
pub mod verify;

const API_PATH: &str = "/api/data_sources/csv";

/// Configures and returns the Actix scope for CSV data source routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        // Route to upload a new pledge export.
        .route("/upload", post().to(upload::process))
}
