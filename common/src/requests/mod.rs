use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
/// Request payload for the batch processing endpoint.
/// When `csv_path` is absent the configured default export is used.
pub struct StartProcessRequest {
    #[serde(default)]
    pub csv_path: Option<String>,
}
