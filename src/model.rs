use serde::{Deserialize, Serialize};

/// Symbology recorded when a scan does not say what it was.
pub const DEFAULT_KIND: &str = "qr";

/// One persisted scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedCode {
    pub id: String,
    #[serde(default)]
    pub data: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// Milliseconds since the unix epoch, assigned by the store.
    #[serde(default)]
    pub timestamp: i64,
}

/// Insert payload. Missing fields fall back to the column defaults.
///
/// Also the body of a remote create, which is why `timestamp` is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScannedCode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl NewScannedCode {
    pub fn new(data: impl Into<String>, kind: impl Into<String>) -> Self {
        NewScannedCode {
            id: None,
            data: Some(data.into()),
            kind: Some(kind.into()),
        }
    }

    pub fn data_or_default(&self) -> &str {
        self.data.as_deref().unwrap_or("")
    }

    pub fn kind_or_default(&self) -> &str {
        self.kind.as_deref().unwrap_or(DEFAULT_KIND)
    }
}

/// What the camera hands over for every detected code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub data: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<ScanEvent> for NewScannedCode {
    fn from(event: ScanEvent) -> Self {
        NewScannedCode::new(event.data, event.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
}

/// Aggregate view over the whole scan log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeStats {
    pub total: u64,
    /// Sorted by count descending, ties by type name.
    #[serde(rename = "porTipo")]
    pub by_type: Vec<TypeCount>,
    /// ISO-8601 time of the newest scan, `None` when the log is empty.
    #[serde(rename = "ultimoEscaneo")]
    pub last_scan: Option<String>,
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}
