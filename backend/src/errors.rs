use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file {path} unreadable: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("variant id {0} is used by more than one catalog entry")]
    DuplicateVariant(String),
    #[error("catalog entry {entry} has a non-positive unit price")]
    NonPositivePrice { entry: String },
    #[error("{context} references unknown catalog entry {entry}")]
    UnknownEntry { context: String, entry: String },
    #[error("{context} references undeclared raw key {key}")]
    UnknownKey { context: String, key: String },
    #[error("raw key {0} is declared more than once")]
    DuplicateKey(String),
    #[error("header {0} is mapped to more than one raw key")]
    DuplicateHeader(String),
    #[error("combination rule pairs {0} with itself")]
    SelfCombination(String),
}

/// Reason a single export row was skipped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowError {
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("unparseable pledge amount {0:?}")]
    InvalidAmount(String),
    #[error("duplicate backer id {0}")]
    DuplicateBacker(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("pledge export {path} unreadable: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("pledge export is malformed: {0}")]
    Csv(#[from] csv::Error),
    #[error("pledge export has no {0} column")]
    MissingColumn(&'static str),
}

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CommerceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            CommerceError::Decode(error.to_string())
        } else {
            CommerceError::Transport(error.to_string())
        }
    }
}

/// A failed pipeline step. The `Display` text is what the ledger records.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("customer lookup failed: {0}")]
    CustomerLookup(#[source] CommerceError),
    #[error("customer creation failed: {0}")]
    CustomerCreate(#[source] CommerceError),
    #[error("discount issuance failed: {0}")]
    Discount(#[source] CommerceError),
    #[error("{step} timed out after {millis} ms")]
    Timeout { step: &'static str, millis: u64 },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("export encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("snapshot {0} already exists")]
    SnapshotExists(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("token is not valid base64")]
    Encoding,
    #[error("token is malformed")]
    Malformed,
}

/// Why a batch could not be started.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("a fulfillment batch is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("loader task failed: {0}")]
    Worker(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("no fulfilled backer matches this link")]
    NotFound,
}
