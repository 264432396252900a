use serde::{Deserialize, Serialize};

/// A header of an uploaded export that was recognised as a quantity column.
///
/// Produced while verifying an upload so the operator can check that every
/// product column of the campaign export is picked up before a run starts.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ColumnMatch {
    /// The header exactly as it appears in the file.
    pub header: String,
    /// The raw item key the header normalises to.
    pub key: String,
}
