use super::types::{ImportBatchResult, RowError};
use serde::Serialize;
use utoipa::ToSchema;

pub const MAX_ERROR_MESSAGE_CHARS: usize = 200;

const GENERIC_ROW_ERROR: &str = "This record could not be saved";

/// What an import endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// True when at least one record was saved
    pub success: bool,
    pub imported: usize,
    pub failed: usize,
    pub total: usize,
    pub errors: Vec<RowError>,
    pub skipped_sheets: Vec<String>,
    /// Failures beyond the reported error list
    #[serde(skip_serializing_if = "is_zero")]
    pub omitted_errors: usize,
    pub message: String,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Turns a write tally into a client-facing summary.
#[derive(Debug, Clone)]
pub struct Reporter {
    max_errors: usize,
    expose_details: bool,
}

impl Reporter {
    pub fn new(max_errors: usize, expose_details: bool) -> Self {
        Self {
            max_errors,
            expose_details,
        }
    }

    pub fn summarize(&self, result: ImportBatchResult, skipped_sheets: Vec<String>) -> ImportSummary {
        let total = result.total();
        let omitted_errors = result.errors.len().saturating_sub(self.max_errors);
        let errors = self.present_errors(result.errors);

        let message = if result.failed == 0 {
            format!("Imported {} client(s)", result.succeeded)
        } else {
            format!(
                "Imported {} of {} client(s); {} failed",
                result.succeeded, total, result.failed
            )
        };

        ImportSummary {
            success: result.succeeded > 0,
            imported: result.succeeded,
            failed: result.failed,
            total,
            errors,
            skipped_sheets,
            omitted_errors,
            message,
        }
    }

    /// Caps the list and hides datastore text unless details are exposed.
    pub fn present_errors(&self, errors: Vec<RowError>) -> Vec<RowError> {
        errors
            .into_iter()
            .take(self.max_errors)
            .map(|error| RowError {
                message: if self.expose_details {
                    truncate_message(&error.message)
                } else {
                    GENERIC_ROW_ERROR.to_string()
                },
                ..error
            })
            .collect()
    }
}

fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((end, _)) => format!("{}…", &message[..end]),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failures(n: usize, message: &str) -> ImportBatchResult {
        ImportBatchResult {
            succeeded: 0,
            failed: n,
            errors: (0..n)
                .map(|i| RowError {
                    row: i + 2,
                    sheet: None,
                    chunk: None,
                    message: message.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_error_list_is_capped() {
        let summary = Reporter::new(50, true).summarize(failures(80, "boom"), vec![]);
        assert_eq!(summary.errors.len(), 50);
        assert_eq!(summary.omitted_errors, 30);
        assert_eq!(summary.failed, 80);
        assert!(!summary.success);
    }

    #[test]
    fn test_messages_hidden_without_details() {
        let summary = Reporter::new(50, false)
            .summarize(failures(1, "UNIQUE constraint failed: clients.id"), vec![]);
        assert_eq!(summary.errors[0].message, GENERIC_ROW_ERROR);
    }

    #[test]
    fn test_long_messages_truncated() {
        let long = "x".repeat(500);
        let summary = Reporter::new(50, true).summarize(failures(1, &long), vec![]);
        assert_eq!(summary.errors[0].message.chars().count(), MAX_ERROR_MESSAGE_CHARS + 1);
    }

    #[test]
    fn test_partial_success_json_shape() {
        let mut result = failures(1, "bad");
        result.succeeded = 2;
        let summary = Reporter::new(50, true).summarize(result, vec!["Master".to_string()]);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["imported"], 2);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["total"], 3);
        assert_eq!(json["skippedSheets"][0], "Master");
        assert_eq!(json["errors"][0]["row"], 2);
        assert!(json.get("omittedErrors").is_none());
    }
}
