//! Tabular client import: sniff, read, normalize, write, report.

pub mod chunked;
pub mod error;
pub mod mapping;
pub mod normalize;
pub mod readers;
pub mod report;
pub mod sanitize;
pub mod sheets;
pub mod sniffer;
pub mod types;
pub mod writer;

use crate::config::ImportConfig;
use crate::services::client_store::ClientStore;
use crate::services::sessions::UploadSessionStore;
use crate::utils::validation::validate_file_size;
use error::ImportError;
use normalize::{locate_header, records_from_grid, records_from_objects};
use readers::{NamedSheet, read_csv, read_workbook};
use report::{ImportSummary, Reporter};
use serde_json::{Map, Value};
use sheets::{is_skipped_sheet, records_from_sheets};
use sniffer::{FileFormat, sniff};
use std::sync::Arc;
use types::{Owner, PendingRecord, SheetLayout, UploadedFile};
use writer::{BatchWriter, RetryPolicy};

/// How parsed records were laid out in the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedShape {
    /// Header row followed by one client per row
    Table,
    /// One client per worksheet
    ClientPerSheet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedImport {
    pub shape: ParsedShape,
    pub records: Vec<PendingRecord>,
    pub skipped_sheets: Vec<String>,
}

/// Sniffs and decodes an upload into pending records. CPU-bound; callers on
/// the runtime should go through `spawn_blocking`.
pub fn parse_upload(
    file: &UploadedFile,
    owner: &Owner,
    layout: SheetLayout,
    max_rows: usize,
) -> Result<ParsedImport, ImportError> {
    let format = sniff(&file.file_name, file.content_type.as_deref(), &file.data)?;
    tracing::debug!("🔍 '{}' sniffed as {:?}", file.file_name, format);

    match (format, layout) {
        (FileFormat::Csv, SheetLayout::MultiSheet) => Err(ImportError::UnsupportedFormat(
            "per-client imports need a workbook (.xlsx or .xls) with one sheet per client"
                .to_string(),
        )),
        (FileFormat::Csv, SheetLayout::Auto) => {
            let grid = read_csv(&file.data)?;
            Ok(ParsedImport {
                shape: ParsedShape::Table,
                records: records_from_grid(&grid, owner, max_rows)?,
                skipped_sheets: Vec::new(),
            })
        }
        (FileFormat::Spreadsheet, SheetLayout::MultiSheet) => {
            per_sheet(read_workbook(&file.data)?, owner, max_rows)
        }
        (FileFormat::Spreadsheet, SheetLayout::Auto) => {
            let sheets = read_workbook(&file.data)?;
            let tabular = sheets
                .iter()
                .find(|s| !is_skipped_sheet(&s.name))
                .filter(|s| locate_header(&s.grid).is_some());

            match tabular {
                Some(sheet) => {
                    tracing::debug!("Reading sheet '{}' as a table", sheet.name);
                    Ok(ParsedImport {
                        shape: ParsedShape::Table,
                        records: records_from_grid(&sheet.grid, owner, max_rows)?,
                        skipped_sheets: Vec::new(),
                    })
                }
                None => per_sheet(sheets, owner, max_rows),
            }
        }
    }
}

fn per_sheet(
    sheets: Vec<NamedSheet>,
    owner: &Owner,
    max_rows: usize,
) -> Result<ParsedImport, ImportError> {
    if sheets.len() > max_rows {
        return Err(ImportError::TooManyRows {
            count: sheets.len(),
            limit: max_rows,
        });
    }
    let import = records_from_sheets(&sheets, owner);
    Ok(ParsedImport {
        shape: ParsedShape::ClientPerSheet,
        records: import.records,
        skipped_sheets: import.skipped_sheets,
    })
}

/// Entry point for every import route.
pub struct ImportService {
    store: Arc<dyn ClientStore>,
    sessions: UploadSessionStore,
    config: ImportConfig,
    reporter: Reporter,
}

impl ImportService {
    pub fn new(
        store: Arc<dyn ClientStore>,
        sessions: UploadSessionStore,
        config: ImportConfig,
    ) -> Self {
        let reporter = Reporter::new(config.max_reported_errors, config.expose_error_details);
        Self {
            store,
            sessions,
            config,
            reporter,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn sessions(&self) -> &UploadSessionStore {
        &self.sessions
    }

    /// Imports one fully buffered upload.
    pub async fn import_file(
        &self,
        owner: &Owner,
        file: UploadedFile,
        layout: SheetLayout,
    ) -> Result<ImportSummary, ImportError> {
        let limit = match layout {
            SheetLayout::Auto => self.config.max_import_file_size,
            SheetLayout::MultiSheet => self.config.max_multi_sheet_file_size,
        };
        validate_file_size(file.data.len(), limit)?;
        self.run_file_pipeline(owner, file, layout).await
    }

    /// Parses off the runtime, then writes with the batch size for the shape.
    pub(crate) async fn run_file_pipeline(
        &self,
        owner: &Owner,
        file: UploadedFile,
        layout: SheetLayout,
    ) -> Result<ImportSummary, ImportError> {
        tracing::info!(
            "📥 Importing '{}' ({} bytes) for user {}",
            file.file_name,
            file.data.len(),
            owner.user_id
        );

        let max_rows = self.config.max_rows_per_file;
        let parse_owner = owner.clone();
        let parsed =
            tokio::task::spawn_blocking(move || parse_upload(&file, &parse_owner, layout, max_rows))
                .await
                .map_err(|e| ImportError::Internal(format!("parser task failed: {}", e)))??;

        if parsed.records.is_empty() {
            let reason = match parsed.shape {
                ParsedShape::Table => "every row is missing a client name".to_string(),
                ParsedShape::ClientPerSheet => format!(
                    "no client sheets found ({} skipped)",
                    parsed.skipped_sheets.len()
                ),
            };
            return Err(ImportError::NoValidRecords(reason));
        }

        let batch_size = match parsed.shape {
            ParsedShape::Table => self.config.file_batch_size,
            ParsedShape::ClientPerSheet => self.config.multi_sheet_batch_size,
        };
        let writer = BatchWriter::new(self.store.clone(), batch_size)
            .with_inter_batch_delay(self.config.inter_batch_delay());
        let result = writer.write(&parsed.records).await;

        tracing::info!(
            "✅ Import finished: {} saved, {} failed, {} sheet(s) skipped",
            result.succeeded,
            result.failed,
            parsed.skipped_sheets.len()
        );
        Ok(self.reporter.summarize(result, parsed.skipped_sheets))
    }

    /// Imports rows the client already parsed into objects.
    pub async fn import_json(
        &self,
        owner: &Owner,
        rows: &[Map<String, Value>],
    ) -> Result<ImportSummary, ImportError> {
        if rows.is_empty() {
            return Err(ImportError::InvalidRequest(
                "records must contain at least one row".to_string(),
            ));
        }
        if rows.len() > self.config.max_json_records {
            return Err(ImportError::TooManyRows {
                count: rows.len(),
                limit: self.config.max_json_records,
            });
        }

        let records = records_from_objects(rows, owner, 1);
        if records.is_empty() {
            return Err(ImportError::NoValidRecords(
                "every record is missing a client name".to_string(),
            ));
        }

        let writer = BatchWriter::new(self.store.clone(), self.config.json_batch_size)
            .with_inter_batch_delay(self.config.inter_batch_delay());
        let result = writer.write(&records).await;

        tracing::info!(
            "✅ JSON import for user {}: {} saved, {} failed",
            owner.user_id,
            result.succeeded,
            result.failed
        );
        Ok(self.reporter.summarize(result, Vec::new()))
    }

    pub(crate) fn stream_writer(&self) -> BatchWriter {
        BatchWriter::new(self.store.clone(), self.config.stream_batch_size)
            .with_inter_batch_delay(self.config.inter_batch_delay())
            .with_retry(RetryPolicy::exponential(
                self.config.retry_max_attempts,
                std::time::Duration::from_millis(self.config.retry_base_delay_ms),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::import::writer::tests::MockClientStore;
    use serde_json::json;

    fn owner() -> Owner {
        Owner {
            user_id: "coach-1".to_string(),
            organization_id: None,
        }
    }

    fn service(store: Arc<MockClientStore>) -> ImportService {
        ImportService::new(store, UploadSessionStore::new(), ImportConfig::development())
    }

    fn csv_upload(body: &str) -> UploadedFile {
        UploadedFile {
            file_name: "clients.csv".to_string(),
            content_type: Some("text/csv".to_string()),
            data: bytes::Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_csv_import_round_trip() {
        let store = Arc::new(MockClientStore::default());
        let summary = service(store.clone())
            .import_file(
                &owner(),
                csv_upload("Name,Email,Goals\nAnn,ann@example.com,Run 5k\n,,\nBo,,\n"),
                SheetLayout::Auto,
            )
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(store.saved_names(), vec!["Ann", "Bo"]);
        let saved = store.saved.lock().unwrap();
        assert_eq!(saved[0].goals.as_deref(), Some("Run 5k"));
        assert_eq!(saved[0].user_id, "coach-1");
    }

    #[tokio::test]
    async fn test_only_blank_names_is_no_valid_records() {
        let store = Arc::new(MockClientStore::default());
        let err = service(store)
            .import_file(&owner(), csv_upload("Name,Email\n ,a@b.c\n"), SheetLayout::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NO_VALID_RECORDS");
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_parsing() {
        let store = Arc::new(MockClientStore::default());
        let mut config = ImportConfig::development();
        config.max_import_file_size = 8;
        let service = ImportService::new(store, UploadSessionStore::new(), config);

        let err = service
            .import_file(&owner(), csv_upload("Name\nAnn Lee\n"), SheetLayout::Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_csv_cannot_be_per_client() {
        let store = Arc::new(MockClientStore::default());
        let err = service(store)
            .import_file(&owner(), csv_upload("Name\nAnn\n"), SheetLayout::MultiSheet)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported() {
        let store = Arc::new(MockClientStore::default());
        let summary = service(store)
            .import_file(&owner(), csv_upload("Name\nAnn\nBAD row\nCy\n"), SheetLayout::Auto)
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].row, 3);
    }

    #[tokio::test]
    async fn test_json_import() {
        let store = Arc::new(MockClientStore::default());
        let rows: Vec<Map<String, Value>> = [
            json!({"name": "Ann", "goals": "Mobility"}),
            json!({"name": ""}),
            json!({"Full Name": "Bo", "age": "41"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let summary = service(store.clone()).import_json(&owner(), &rows).await.unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(store.saved_names(), vec!["Ann", "Bo"]);
    }

    #[tokio::test]
    async fn test_json_import_limits() {
        let store = Arc::new(MockClientStore::default());
        let service = service(store);

        let err = service.import_json(&owner(), &[]).await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidRequest(_)));

        let too_many = vec![Map::new(); service.config().max_json_records + 1];
        let err = service.import_json(&owner(), &too_many).await.unwrap_err();
        assert!(matches!(err, ImportError::TooManyRows { .. }));
    }
}
