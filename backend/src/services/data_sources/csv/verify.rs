//! Header inspection for pledge exports.
//!
//! Resolves every header of an export once: identity and shipping columns by
//! their fixed names, quantity columns through the catalog's declarative
//! column table. Rows are then read by index only.

use crate::engine::CatalogTable;
use crate::errors::LoadError;
use common::model::csv::ColumnMatch;
use std::collections::HashMap;

/// Fixed column names of the campaign export.
pub mod columns {
    pub const BACKER_UID: &str = "Backer UID";
    pub const BACKER_NUMBER: &str = "Backer Number";
    pub const BACKER_NAME: &str = "Backer Name";
    pub const EMAIL: &str = "Email";
    pub const PLEDGE_AMOUNT: &str = "Pledge Amount";
    pub const REWARD_TITLE: &str = "Reward Title";
    pub const SHIPPING_NAME: &str = "Shipping Name";
    pub const SHIPPING_ADDRESS_1: &str = "Shipping Address 1";
    pub const SHIPPING_ADDRESS_2: &str = "Shipping Address 2";
    pub const SHIPPING_CITY: &str = "Shipping City";
    pub const SHIPPING_STATE: &str = "Shipping State";
    pub const SHIPPING_POSTAL_CODE: &str = "Shipping Postal Code";
    pub const SHIPPING_COUNTRY_NAME: &str = "Shipping Country Name";
    pub const SHIPPING_COUNTRY: &str = "Shipping Country";
    pub const SHIPPING_COUNTRY_CODE: &str = "Shipping Country Code";
    pub const SHIPPING_PHONE: &str = "Shipping Phone Number";
    pub const FULFILLMENT_STATUS: &str = "Fulfillment Status";
    pub const PLEDGED_AT: &str = "Pledged At (UTC)";

    /// Columns without which a row cannot be processed.
    pub const REQUIRED: [&str; 4] = [BACKER_UID, EMAIL, BACKER_NAME, PLEDGE_AMOUNT];

    pub const KNOWN: [&str; 18] = [
        BACKER_UID,
        BACKER_NUMBER,
        BACKER_NAME,
        EMAIL,
        PLEDGE_AMOUNT,
        REWARD_TITLE,
        SHIPPING_NAME,
        SHIPPING_ADDRESS_1,
        SHIPPING_ADDRESS_2,
        SHIPPING_CITY,
        SHIPPING_STATE,
        SHIPPING_POSTAL_CODE,
        SHIPPING_COUNTRY_NAME,
        SHIPPING_COUNTRY,
        SHIPPING_COUNTRY_CODE,
        SHIPPING_PHONE,
        FULFILLMENT_STATUS,
        PLEDGED_AT,
    ];

    /// Free-text engraving answers live in a survey column whose exact title varies.
    pub const ENGRAVING_MARKER: &str = "engraving";
}

/// Column positions resolved from an export header.
#[derive(Debug, Clone)]
pub struct HeaderLayout {
    named: HashMap<&'static str, usize>,
    /// (column index, raw item key)
    pub quantities: Vec<(usize, String)>,
    pub engraving: Option<usize>,
    pub matches: Vec<ColumnMatch>,
    pub ignored: Vec<String>,
}

impl HeaderLayout {
    pub fn index(&self, column: &str) -> Option<usize> {
        self.named.get(column).copied()
    }
}

pub fn normalize_cell(cell: &str) -> String {
    let s = cell.trim();
    // strip one layer of surrounding quotes
    let s = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s);
    s.replace('\u{00A0}', " ").trim().to_string()
}

/// Picks the most frequent candidate delimiter in the header line; ties go to the comma.
pub fn detect_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t', b'|']
        .iter()
        .rev()
        .max_by_key(|&&d| header_line.matches(d as char).count())
        .copied()
        .unwrap_or(b',')
}

pub fn inspect_headers(headers: &[String], catalog: &CatalogTable) -> Result<HeaderLayout, LoadError> {
    let mut named = HashMap::new();
    let mut quantities = Vec::new();
    let mut engraving = None;
    let mut matches = Vec::new();
    let mut ignored = Vec::new();

    for (idx, raw_header) in headers.iter().enumerate() {
        let header = normalize_cell(raw_header);
        if let Some(known) = columns::KNOWN.iter().find(|c| c.eq_ignore_ascii_case(&header)) {
            named.entry(*known).or_insert(idx);
        } else if let Some(key) = catalog.raw_key_for_header(&header) {
            quantities.push((idx, key.to_string()));
            matches.push(ColumnMatch {
                header: header.clone(),
                key: key.to_string(),
            });
        } else if engraving.is_none() && header.to_lowercase().contains(columns::ENGRAVING_MARKER) {
            engraving = Some(idx);
        } else {
            ignored.push(header);
        }
    }

    if let Some(missing) = columns::REQUIRED.iter().find(|c| !named.contains_key(*c)) {
        return Err(LoadError::MissingColumn(*missing));
    }

    Ok(HeaderLayout {
        named,
        quantities,
        engraving,
        matches,
        ignored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::tests::ambient_catalog;

    fn headers(line: &str) -> Vec<String> {
        line.split(',').map(str::to_string).collect()
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("Backer UID;Email;Pledge Amount"), b';');
        assert_eq!(detect_delimiter("Backer UID,Email,Pledge Amount"), b',');
        assert_eq!(detect_delimiter("Backer UID\tEmail"), b'\t');
    }

    #[test]
    fn test_normalize_cell() {
        assert_eq!(normalize_cell("  \"ambient one\" "), "ambient one");
        assert_eq!(normalize_cell("'Email'"), "Email");
        assert_eq!(normalize_cell("charging\u{00A0}dock"), "charging dock");
    }

    #[test]
    fn test_inspect_headers_resolves_columns() {
        let layout = inspect_headers(
            &headers("Backer UID,Backer Name,Email,Pledge Amount,ambient one,Black Anodising,Notes,ambientone engraving: max 14 chars"),
            &ambient_catalog(),
        )
        .unwrap();

        assert_eq!(layout.index(columns::EMAIL), Some(2));
        assert_eq!(
            layout.quantities,
            vec![(4, "ambientone".to_string()), (5, "blackanodising".to_string())]
        );
        assert_eq!(layout.engraving, Some(7));
        assert_eq!(layout.ignored, vec!["Notes".to_string()]);
        assert_eq!(layout.matches.len(), 2);
    }

    #[test]
    fn test_missing_required_column() {
        let err = inspect_headers(&headers("Backer UID,Backer Name,Email"), &ambient_catalog()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(columns::PLEDGE_AMOUNT)));
    }
}
