pub mod allocation;
pub mod catalog;

pub use allocation::allocate;
pub use catalog::CatalogTable;
