use serde::Serialize;

// ------------- Source -------------

/// What a resolved location string points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    File,
    Url,
    OnTheFly,
    Unknown,
}

impl SourceKind {
    pub fn classify(location: &str) -> Self {
        if ["/", "./", "../", "file://"].iter().any(|p| location.starts_with(p)) {
            SourceKind::File
        } else if location.starts_with("http://") || location.starts_with("https://") {
            SourceKind::Url
        } else if location.starts_with("OTF://") {
            SourceKind::OnTheFly
        } else {
            SourceKind::Unknown
        }
    }
}

// ------------- Candidate -------------

/// One resolved pair of locations for a quantity, from one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub quantity: String,
    pub valid_at: String,
    pub dims: i32,
    pub target: String,
    pub units: String,
    pub scale: f64,
    pub offset: f64,
    pub description: String,
    pub kind: SourceKind,
    /// the target's attribute values, in schema order
    pub attributes: Vec<String>,
    pub snapshots: i64,
    pub spacing_days: f64,
    pub pre: String,
    pub pre_time: String,
    pub pre_start: String,
    pub pre_start_days: f64,
    pub pre_index: i64,
    pub post: String,
    pub post_time: String,
    pub post_start: String,
    pub post_start_days: f64,
    pub post_index: i64,
}
