pub mod catalog;
pub mod commerce;
pub mod data_sources;
pub mod fulfillment;
pub mod health;
