use crate::model::csv::ColumnMatch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub md5: String,
    pub path: String,
    pub kind: DataSourceType,
    pub quantity_columns: Vec<ColumnMatch>,
    /// Headers not used by the loader.
    pub ignored_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataSourceType {
    Csv,
}
