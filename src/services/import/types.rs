use serde::Serialize;
use utoipa::ToSchema;

/// Who an imported record belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user_id: String,
    pub organization_id: Option<String>,
}

/// Canonical client shape every importer converges on before persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientRecord {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub goals: Option<String>,
    pub injuries: Option<String>,
    pub equipment: Vec<String>,
    pub notes: Option<String>,
    pub membership: Option<String>,
    pub fitness_level: Option<String>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub user_id: String,
    pub organization_id: Option<String>,
}

/// A normalized record together with where it came from in the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    /// 1-based row (or sheet position for per-client workbooks)
    pub row: usize,
    pub sheet: Option<String>,
    pub record: ClientRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Set for rows that arrived in a streamed chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<u32>,
    pub message: String,
}

/// Outcome of writing a list of records. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatchResult {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

impl ImportBatchResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn merge(&mut self, other: ImportBatchResult) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }

    pub(crate) fn record_failure(&mut self, pending: &PendingRecord, message: String) {
        self.failed += 1;
        self.errors.push(RowError {
            row: pending.row,
            sheet: pending.sheet.clone(),
            chunk: None,
            message,
        });
    }
}

/// A file received over HTTP, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: bytes::Bytes,
}

/// How a workbook should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetLayout {
    /// Header-row table if one is found, otherwise one client per sheet
    Auto,
    /// One client per sheet, sheet name is the client name
    MultiSheet,
}
