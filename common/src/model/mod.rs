pub mod catalog;
pub mod csv;
pub mod datasource;
pub mod fulfillment;
pub mod item;
pub mod pledge;
