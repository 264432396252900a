use crate::engine::CatalogTable;
use crate::services::data_sources::csv::verify::{detect_delimiter, inspect_headers, HeaderLayout};
use crate::services::fulfillment::state::FulfillmentState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::datasource::{DataSource, DataSourceType};
use futures_util::StreamExt;
use log::info;
use md5::Context;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// HTTP handler wrapper that converts internal result to an `HttpResponse`.
///
/// - On success: returns `200 OK` with the stored `DataSource` as JSON.
/// - On failure: returns `400 Bad Request` with the error message.
pub async fn process(payload: Multipart, state: web::Data<FulfillmentState>) -> impl Responder {
    match upload_data_source(payload, &state.catalog, &state.config.upload_dir).await {
        Ok(source) => HttpResponse::Ok().json(source),
        Err(e) => HttpResponse::BadRequest().body(format!("Error: {}", e)),
    }
}

/// Stores an uploaded pledge export as `{upload_dir}/{md5}.csv`.
///
/// The header is verified against the catalog column table as soon as the
/// first line has arrived; nothing is kept if it lacks a required column.
pub async fn upload_data_source(
    mut payload: Multipart,
    catalog: &CatalogTable,
    upload_dir: &Path,
) -> Result<DataSource, Box<dyn std::error::Error>> {
    let mut stored: Option<DataSource> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if field_name.as_deref() != Some("file") {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        if !filename.to_lowercase().ends_with(".csv") {
            return Err("The file must end with .csv".into());
        }

        std::fs::create_dir_all(upload_dir)?;
        let mut temp = NamedTempFile::new_in(upload_dir)?;
        let mut md5_hasher = Context::new();
        let mut header_buf: Vec<u8> = Vec::new();
        let mut layout = None;

        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            md5_hasher.consume(&chunk);
            temp.write_all(&chunk)?;

            if layout.is_none() {
                header_buf.extend_from_slice(&chunk);
                if let Some(pos) = header_buf.iter().position(|&b| b == b'\n') {
                    layout = Some(verify_header(&header_buf[..pos], catalog)?);
                }
            }
        }
        let layout = match layout {
            Some(layout) => layout,
            None => verify_header(&header_buf, catalog)?,
        };

        let md5 = format!("{:x}", md5_hasher.finalize());
        let target = upload_dir.join(format!("{}.csv", md5));
        temp.persist(&target)?;
        info!("Stored pledge export {} as {}", filename, target.display());

        stored = Some(DataSource {
            md5,
            path: target.display().to_string(),
            kind: DataSourceType::Csv,
            quantity_columns: layout.matches,
            ignored_columns: layout.ignored,
        });
    }

    stored.ok_or_else(|| "Missing file".into())
}

fn verify_header(line: &[u8], catalog: &CatalogTable) -> Result<HeaderLayout, Box<dyn std::error::Error>> {
    let mut line = line.to_vec();
    if line.ends_with(b"\r") {
        line.pop();
    }
    let header = String::from_utf8(line).map_err(|_| "Header is not valid UTF-8")?;
    let header = header.trim_start_matches('\u{feff}');
    if header.trim().is_empty() {
        return Err("CSV header must not be empty".into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(header))
        .has_headers(false)
        .from_reader(header.as_bytes());
    let cells: Vec<String> = match reader.records().next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => Vec::new(),
    };
    Ok(inspect_headers(&cells, catalog)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::tests::ambient_catalog;

    #[test]
    fn test_verify_header_accepts_export_header() {
        let layout = verify_header(
            b"\xef\xbb\xbfBacker UID;Backer Name;Email;Pledge Amount;ambient one;Survey\r",
            &ambient_catalog(),
        )
        .unwrap();

        assert_eq!(layout.matches.len(), 1);
        assert_eq!(layout.matches[0].key, "ambientone");
        assert_eq!(layout.ignored, vec!["Survey".to_string()]);
    }

    #[test]
    fn test_verify_header_rejects_incomplete_header() {
        let err = verify_header(b"Backer UID,Email", &ambient_catalog()).unwrap_err();
        assert_eq!(err.to_string(), "pledge export has no Backer Name column");
        assert!(verify_header(b"   ", &ambient_catalog()).is_err());
    }
}
