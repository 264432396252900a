//! Backers of the current run with their allocated items, keyed by backer id.

use crate::engine::{allocate, CatalogTable};
use common::model::item::CanonicalPledgedItem;
use common::model::pledge::RawPledgeRow;
use log::warn;
use rayon::prelude::*;
use std::collections::HashMap;

/// A loaded backer and the items allocated for them.
#[derive(Debug, Clone)]
pub struct BackerRecord {
    pub row: RawPledgeRow,
    pub items: Vec<CanonicalPledgedItem>,
}

/// The backers of one run, in export order. Written once when a run starts.
#[derive(Debug, Default)]
pub struct BackerDirectory {
    records: Vec<BackerRecord>,
    index: HashMap<String, usize>,
}

impl BackerDirectory {
    pub fn build(rows: Vec<RawPledgeRow>, catalog: &CatalogTable) -> Self {
        let records: Vec<BackerRecord> = rows
            .into_par_iter()
            .map(|row| {
                let items = allocate(&row.raw_counts, catalog);
                BackerRecord { row, items }
            })
            .collect();

        for record in &records {
            for item in record.items.iter().filter(|item| !item.is_matched()) {
                warn!(
                    "Backer {}: no catalog match for {} x{}",
                    record.row.backer_id, item.source_key, item.quantity
                );
            }
        }

        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.row.backer_id.clone(), i))
            .collect();
        Self { records, index }
    }

    pub fn get(&self, backer_id: &str) -> Option<&BackerRecord> {
        self.index.get(backer_id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[BackerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::tests::ambient_catalog;
    use common::model::pledge::{RawCounts, ShippingAddress};
    use rust_decimal::Decimal;

    fn row(backer_id: &str, counts: &[(&str, u32)]) -> RawPledgeRow {
        RawPledgeRow {
            backer_id: backer_id.to_string(),
            email: format!("{}@example.com", backer_id),
            name: "Backer".to_string(),
            pledge_amount: Decimal::new(100, 0),
            reward_title: String::new(),
            order_id: String::new(),
            shipping_address: ShippingAddress::default(),
            custom_engraving: None,
            fulfillment_status: None,
            pledged_at: None,
            raw_counts: counts
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<RawCounts>(),
        }
    }

    #[test]
    fn test_build_preserves_order_and_indexes() {
        let rows: Vec<_> = (0..50)
            .map(|i| row(&format!("b{}", i), &[("ambientone", i % 3)]))
            .collect();
        let directory = BackerDirectory::build(rows, &ambient_catalog());

        assert_eq!(directory.len(), 50);
        for (i, record) in directory.records().iter().enumerate() {
            assert_eq!(record.row.backer_id, format!("b{}", i));
        }
        assert!(directory.get("b7").is_some());
        assert!(directory.get("missing").is_none());
    }

    #[test]
    fn test_build_allocates_items() {
        let directory = BackerDirectory::build(
            vec![row("5001", &[("ambientone", 2), ("blackanodising", 1)])],
            &ambient_catalog(),
        );

        let items = &directory.get("5001").unwrap().items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].variant_id.as_deref(), Some("52337643290957"));
        assert_eq!(items[1].variant_id.as_deref(), Some("52337643323725"));
    }
}
