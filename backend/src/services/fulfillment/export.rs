//! Flat CSV export of the result ledger.
//!
//! Every export writes a timestamped snapshot, which never replaces an
//! existing file, and refreshes the `fulfillment-results.csv` latest copy.
//! Both are written to a temporary file in the results directory first and
//! then moved into place.

use crate::errors::ExportError;
use chrono::{DateTime, Utc};
use common::model::fulfillment::{FulfillmentResult, FulfillmentSuccess};
use log::info;
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const EXPORT_STEM: &str = "fulfillment-results";

const HEADER: [&str; 15] = [
    "email",
    "name",
    "pledge_amount",
    "reward_title",
    "discount_code",
    "landing_page_url",
    "cart_link",
    "checkout_link",
    "items_found",
    "items_not_found",
    "order_id",
    "backer_id",
    "custom_engraving",
    "status",
    "error",
];

#[derive(Debug, Clone, Serialize)]
pub struct ExportPaths {
    pub snapshot: PathBuf,
    pub latest: PathBuf,
}

pub fn write_export(
    results: &[FulfillmentResult],
    results_dir: &Path,
    now: DateTime<Utc>,
) -> Result<ExportPaths, ExportError> {
    std::fs::create_dir_all(results_dir)?;
    let table = render_table(results)?;

    let snapshot = results_dir.join(format!(
        "{}-{}.csv",
        EXPORT_STEM,
        now.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    ));
    let mut temp = NamedTempFile::new_in(results_dir)?;
    temp.write_all(&table)?;
    temp.persist_noclobber(&snapshot).map_err(|e| {
        if e.error.kind() == ErrorKind::AlreadyExists {
            ExportError::SnapshotExists(snapshot.display().to_string())
        } else {
            ExportError::Io(e.error)
        }
    })?;

    let latest = results_dir.join(format!("{}.csv", EXPORT_STEM));
    let mut temp = NamedTempFile::new_in(results_dir)?;
    temp.write_all(&table)?;
    temp.persist(&latest).map_err(|e| ExportError::Io(e.error))?;

    info!(
        "Exported {} results to {} and {}",
        results.len(),
        snapshot.display(),
        latest.display()
    );
    Ok(ExportPaths { snapshot, latest })
}

fn render_table(results: &[FulfillmentResult]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for result in results {
        let success = result.success();
        let field = |f: fn(&FulfillmentSuccess) -> &str| success.map(f).unwrap_or_default();
        let items_found = result.items_found_label();
        let items_not_found = result.unmatched_description();
        let pledge_amount = result.pledge_amount.to_string();
        writer.write_record([
            result.email.as_str(),
            result.name.as_str(),
            pledge_amount.as_str(),
            result.reward_title.as_str(),
            field(|s| s.discount_code.as_str()),
            field(|s| s.landing_page_url.as_str()),
            field(|s| s.cart_link.as_str()),
            field(|s| s.checkout_link.as_str()),
            items_found.as_str(),
            items_not_found.as_str(),
            result.order_id.as_str(),
            result.backer_id.as_str(),
            result.custom_engraving.as_deref().unwrap_or_default(),
            result.status().as_str(),
            result.error_reason().unwrap_or_default(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.error().kind().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fulfillment::ledger::tests::{failure, success};
    use chrono::TimeZone;

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_export_writes_snapshot_and_latest() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            success("1", "KS1_000000001", "Early Bird", 1),
            failure("2", "discount issuance failed: request rejected (422): nope"),
        ];
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 30, 5).unwrap();

        let paths = write_export(&results, dir.path(), now).unwrap();

        assert_eq!(
            paths.snapshot.file_name().unwrap(),
            "fulfillment-results-2026-10-19T12-30-05-000Z.csv"
        );
        assert_eq!(paths.latest.file_name().unwrap(), "fulfillment-results.csv");
        assert_eq!(
            std::fs::read(&paths.snapshot).unwrap(),
            std::fs::read(&paths.latest).unwrap()
        );

        let rows = read_rows(&paths.latest);
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][4], "KS1_000000001");
        assert_eq!(&rows[0][8], "1/2");
        assert_eq!(&rows[0][9], "Extra 0 (extra0)");
        assert_eq!(&rows[0][13], "success");
        assert_eq!(&rows[1][4], "");
        assert_eq!(&rows[1][13], "error");
        assert!(rows[1][14].starts_with("discount issuance failed"));
    }

    #[test]
    fn test_reexport_keeps_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let first = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 1).unwrap();

        let a = write_export(&[success("1", "KS1_000000001", "Tier", 0)], dir.path(), first).unwrap();
        let before = std::fs::read(&a.snapshot).unwrap();
        let b = write_export(&[], dir.path(), second).unwrap();

        assert_eq!(std::fs::read(&a.snapshot).unwrap(), before);
        assert_ne!(a.snapshot, b.snapshot);
        assert_eq!(read_rows(&b.latest).len(), 0);
    }

    #[test]
    fn test_same_timestamp_does_not_overwrite_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

        write_export(&[success("1", "KS1_000000001", "Tier", 0)], dir.path(), now).unwrap();
        let err = write_export(&[], dir.path(), now).unwrap_err();
        assert!(matches!(err, ExportError::SnapshotExists(_)));
    }
}
