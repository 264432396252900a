//! The validated, immutable catalog mapping table.
//!
//! A `CatalogTable` is built once at start-up from a [`CatalogDocument`] and
//! shared read-only (behind an `Arc`) by the export loader, the allocation
//! engine and the HTTP layer. Every reference in the document is checked here,
//! so the engine can index entries without further error handling.

use crate::errors::CatalogError;
use common::model::catalog::{
    CatalogDocument, CatalogEntry, CombinationRule, DefaultRule,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CatalogTable {
    document: CatalogDocument,
    /// Lower-cased header -> raw key.
    header_index: HashMap<String, String>,
}

impl CatalogTable {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        Self::new(document)
    }

    pub fn new(document: CatalogDocument) -> Result<Self, CatalogError> {
        let mut keys = HashSet::new();
        let mut header_index = HashMap::new();
        for column in &document.columns {
            if !keys.insert(column.key.as_str()) {
                return Err(CatalogError::DuplicateKey(column.key.clone()));
            }
            for header in &column.headers {
                let normalized = normalize_header(header);
                if header_index.insert(normalized, column.key.clone()).is_some() {
                    return Err(CatalogError::DuplicateHeader(header.clone()));
                }
            }
        }

        let mut variants = HashSet::new();
        for (entry_key, entry) in &document.entries {
            if entry.unit_price <= Decimal::ZERO {
                return Err(CatalogError::NonPositivePrice { entry: entry_key.clone() });
            }
            if !variants.insert(entry.variant_id.as_str()) {
                return Err(CatalogError::DuplicateVariant(entry.variant_id.clone()));
            }
        }

        let check_key = |context: String, key: &str| {
            if keys.contains(key) {
                Ok(())
            } else {
                Err(CatalogError::UnknownKey { context, key: key.to_string() })
            }
        };
        let check_entry = |context: String, entry: &str| {
            if document.entries.contains_key(entry) {
                Ok(())
            } else {
                Err(CatalogError::UnknownEntry { context, entry: entry.to_string() })
            }
        };

        for (i, rule) in document.combinations.iter().enumerate() {
            let context = format!("combination rule {}", i + 1);
            if rule.primary == rule.secondary {
                return Err(CatalogError::SelfCombination(rule.primary.clone()));
            }
            check_key(context.clone(), &rule.primary)?;
            check_key(context.clone(), &rule.secondary)?;
            check_entry(context, &rule.target)?;
        }
        for rule in &document.defaults {
            let context = format!("default for {}", rule.key);
            check_key(context.clone(), &rule.key)?;
            check_entry(context, &rule.target)?;
        }
        for (key, entry) in &document.standalone {
            let context = format!("standalone mapping for {}", key);
            check_key(context.clone(), key)?;
            check_entry(context, entry)?;
        }

        Ok(Self {
            document,
            header_index,
        })
    }

    pub fn document(&self) -> &CatalogDocument {
        &self.document
    }

    pub fn combinations(&self) -> &[CombinationRule] {
        &self.document.combinations
    }

    pub fn defaults(&self) -> &[DefaultRule] {
        &self.document.defaults
    }

    pub fn entry(&self, entry_key: &str) -> Option<&CatalogEntry> {
        self.document.entries.get(entry_key)
    }

    pub fn entry_count(&self) -> usize {
        self.document.entries.len()
    }

    /// Catalog entry a raw key maps to when sold on its own.
    pub fn standalone_entry(&self, raw_key: &str) -> Option<&CatalogEntry> {
        self.document
            .standalone
            .get(raw_key)
            .and_then(|entry_key| self.entry(entry_key))
    }

    /// Raw key for an export header, matched trimmed and case-insensitively.
    pub fn raw_key_for_header(&self, header: &str) -> Option<&str> {
        self.header_index
            .get(&normalize_header(header))
            .map(String::as_str)
    }

    /// Display name for a raw key that has no catalog match.
    pub fn fallback_name(&self, raw_key: &str) -> String {
        self.document
            .columns
            .iter()
            .find(|column| column.key == raw_key)
            .and_then(|column| column.label.clone())
            .unwrap_or_else(|| raw_key.to_string())
    }

    /// Declared raw keys in column order.
    pub fn raw_keys(&self) -> impl Iterator<Item = &str> {
        self.document.columns.iter().map(|column| column.key.as_str())
    }
}

fn normalize_header(header: &str) -> String {
    header.replace('\u{00A0}', " ").trim().to_lowercase()
}
