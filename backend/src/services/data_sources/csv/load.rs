//! Reads a pledge export into validated [`RawPledgeRow`]s.
//!
//! Row-level problems (missing identity, unparseable amount, duplicate backer,
//! a record the CSV reader rejects) skip the row and are reported back; only an
//! unreadable file or a header without the required columns fails the whole
//! load. Cells that are not valid UTF-8 are decoded lossily so the backer is
//! still loaded.

use crate::engine::CatalogTable;
use crate::errors::{LoadError, RowError};
use crate::services::data_sources::csv::verify::{
    columns, detect_delimiter, inspect_headers, normalize_cell, HeaderLayout,
};
use common::model::pledge::{RawCounts, RawPledgeRow, ShippingAddress};
use log::{info, warn};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// A row left out of the load, with its 1-based line number in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: u64,
    pub error: RowError,
}

#[derive(Debug, Default)]
pub struct LoadedExport {
    pub rows: Vec<RawPledgeRow>,
    pub skipped: Vec<SkippedRow>,
}

pub fn load_export(path: &Path, catalog: &CatalogTable) -> Result<LoadedExport, LoadError> {
    let content = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let loaded = read_export(&content, catalog)?;
    info!(
        "Loaded {} backers from {} ({} rows skipped)",
        loaded.rows.len(),
        path.display(),
        loaded.skipped.len()
    );
    Ok(loaded)
}

pub fn read_export(content: &[u8], catalog: &CatalogTable) -> Result<LoadedExport, LoadError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let header_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(&String::from_utf8_lossy(header_line)))
        .flexible(true)
        .from_reader(content);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let layout = inspect_headers(&headers, catalog)?;

    let mut loaded = LoadedExport::default();
    let mut seen = HashSet::new();
    let mut last_line = 1;
    for record in reader.byte_records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(last_line + 1);
                last_line = line;
                warn!("Skipping export line {}: {}", line, e);
                loaded.skipped.push(SkippedRow {
                    line,
                    error: RowError::Malformed(e.to_string()),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(last_line + 1);
        last_line = line;
        let record = decode_record(&record, line);
        let parsed = parse_row(&record, &layout).and_then(|row| {
            if seen.insert(row.backer_id.clone()) {
                Ok(row)
            } else {
                Err(RowError::DuplicateBacker(row.backer_id))
            }
        });
        match parsed {
            Ok(row) => loaded.rows.push(row),
            Err(error) => {
                warn!("Skipping export line {}: {}", line, error);
                loaded.skipped.push(SkippedRow { line, error });
            }
        }
    }
    Ok(loaded)
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn decode_record(record: &csv::ByteRecord, line: u64) -> csv::StringRecord {
    if std::str::from_utf8(record.as_slice()).is_err() {
        warn!("Export line {} is not valid UTF-8, replacing the bad bytes", line);
    }
    record.iter().map(String::from_utf8_lossy).collect()
}

fn parse_row(record: &csv::StringRecord, layout: &HeaderLayout) -> Result<RawPledgeRow, RowError> {
    let field = |column: &str| -> String {
        layout
            .index(column)
            .and_then(|idx| record.get(idx))
            .map(normalize_cell)
            .unwrap_or_default()
    };
    let optional = |column: &str| Some(field(column)).filter(|v| !v.is_empty());
    let required = |column: &'static str| optional(column).ok_or(RowError::MissingField(column));

    let backer_id = required(columns::BACKER_UID)?;
    let email = required(columns::EMAIL)?;
    let name = required(columns::BACKER_NAME)?;
    let pledge_amount = parse_amount(&required(columns::PLEDGE_AMOUNT)?)?;

    let mut raw_counts = RawCounts::new();
    for (idx, key) in &layout.quantities {
        let quantity = record.get(*idx).map(parse_quantity).unwrap_or(0);
        let count = raw_counts.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(quantity);
    }

    let shipping_address = ShippingAddress {
        name: optional(columns::SHIPPING_NAME).unwrap_or_else(|| name.clone()),
        address1: field(columns::SHIPPING_ADDRESS_1),
        address2: field(columns::SHIPPING_ADDRESS_2),
        city: field(columns::SHIPPING_CITY),
        province: field(columns::SHIPPING_STATE),
        zip: field(columns::SHIPPING_POSTAL_CODE),
        country: optional(columns::SHIPPING_COUNTRY_NAME)
            .unwrap_or_else(|| field(columns::SHIPPING_COUNTRY)),
        country_code: field(columns::SHIPPING_COUNTRY_CODE),
        phone: field(columns::SHIPPING_PHONE),
    };

    let custom_engraving = layout
        .engraving
        .and_then(|idx| record.get(idx))
        .map(normalize_cell)
        .filter(|v| !v.is_empty());

    Ok(RawPledgeRow {
        backer_id,
        email,
        name,
        pledge_amount,
        reward_title: field(columns::REWARD_TITLE),
        order_id: field(columns::BACKER_NUMBER),
        shipping_address,
        custom_engraving,
        fulfillment_status: optional(columns::FULFILLMENT_STATUS),
        pledged_at: optional(columns::PLEDGED_AT),
        raw_counts,
    })
}

fn amount_noise() -> &'static Regex {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    NOISE.get_or_init(|| Regex::new(r"[£$€¥,\s]|[A-Z]{3}").expect("static pattern"))
}

/// Parses a pledge amount such as `£1,234.50`, `$99` or `120.00 GBP`.
pub fn parse_amount(raw: &str) -> Result<Decimal, RowError> {
    let cleaned = amount_noise().replace_all(raw, "");
    match Decimal::from_str(&cleaned) {
        Ok(amount) if amount >= Decimal::ZERO => Ok(amount),
        _ => Err(RowError::InvalidAmount(raw.to_string())),
    }
}

/// Quantity cells: anything that is not a non-negative integer counts as zero.
pub fn parse_quantity(raw: &str) -> u32 {
    let cell = normalize_cell(raw);
    cell.parse::<u32>()
        .ok()
        .or_else(|| {
            cell.parse::<f64>()
                .ok()
                .filter(|q| q.is_finite() && *q >= 0.0)
                .map(|q| q.trunc() as u32)
        })
        .unwrap_or(0)
}
