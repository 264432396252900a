use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An orderable catalog variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub variant_id: String,
    pub display_name: String,
    pub unit_price: Decimal,
}

/// Maps one or more export headers onto a raw item key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub key: String,
    pub headers: Vec<String>,
    /// Display name used when the key has no catalog match.
    #[serde(default)]
    pub label: Option<String>,
}

/// Two raw keys consumed together produce the `target` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRule {
    pub primary: String,
    pub secondary: String,
    pub target: String,
}

/// Leftover quantity of `key` after combinations maps to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRule {
    pub key: String,
    pub target: String,
}

/// On-disk shape of the catalog mapping table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub columns: Vec<ColumnDefinition>,
    pub entries: BTreeMap<String, CatalogEntry>,
    #[serde(default)]
    pub combinations: Vec<CombinationRule>,
    #[serde(default)]
    pub defaults: Vec<DefaultRule>,
    #[serde(default)]
    pub standalone: BTreeMap<String, String>,
}
