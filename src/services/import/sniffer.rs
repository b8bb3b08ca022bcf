//! First-match format detection for uploaded files.
//!
//! Order matters: binary magic beats the file name, the file name beats the
//! declared MIME type, and a content sniff is the last resort for
//! misdeclared uploads. A file nothing recognises is rejected, never treated
//! as an empty import.

use super::error::ImportError;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

const SPREADSHEET_MIMES: [&str; 3] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.oasis.opendocument.spreadsheet",
];

const CSV_MIMES: [&str; 4] = [
    "text/csv",
    "application/csv",
    "text/comma-separated-values",
    "text/plain",
];

/// Bytes inspected by the content sniff.
const SNIFF_WINDOW: usize = 8 * 1024;

pub fn sniff(
    file_name: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<FileFormat, ImportError> {
    if data.is_empty() {
        return Err(ImportError::EmptyFile);
    }

    if has_spreadsheet_magic(data) {
        return Ok(FileFormat::Spreadsheet);
    }

    match extension(file_name).as_deref() {
        Some("csv") => return Ok(FileFormat::Csv),
        // Named like a workbook but without the magic: a renamed CSV is
        // common enough to honour, anything else goes to the workbook reader
        // which reports a proper parse error.
        Some("xlsx") | Some("xls") => {
            return Ok(if looks_like_csv(data) {
                FileFormat::Csv
            } else {
                FileFormat::Spreadsheet
            });
        }
        Some("txt") | None => {}
        Some(other) => {
            return Err(ImportError::UnsupportedFormat(format!(
                "'.{}' files are not accepted; upload one of: {}",
                other,
                ALLOWED_EXTENSIONS.map(|e| format!(".{}", e)).join(", ")
            )));
        }
    }

    if let Some(essence) = content_type.and_then(mime_essence) {
        if SPREADSHEET_MIMES.contains(&essence.as_str()) {
            return Ok(FileFormat::Spreadsheet);
        }
        if CSV_MIMES.contains(&essence.as_str()) {
            return Ok(FileFormat::Csv);
        }
    }

    if looks_like_csv(data) {
        tracing::debug!(
            "Content sniff classified '{}' ({:?}) as CSV",
            file_name,
            content_type
        );
        return Ok(FileFormat::Csv);
    }

    Err(ImportError::UnsupportedFormat(format!(
        "could not recognise '{}' as CSV or spreadsheet content",
        file_name
    )))
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn mime_essence(content_type: &str) -> Option<String> {
    content_type
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_lowercase())
}

fn has_spreadsheet_magic(data: &[u8]) -> bool {
    infer::get(data)
        .map(|kind| SPREADSHEET_MIMES.contains(&kind.mime_type()))
        .unwrap_or(false)
}

/// UTF-8 text without NUL bytes whose first non-empty line has a comma.
pub fn looks_like_csv(data: &[u8]) -> bool {
    let window = &data[..data.len().min(SNIFF_WINDOW)];
    if window.contains(&0) {
        return false;
    }

    let text = match std::str::from_utf8(window) {
        Ok(text) => text,
        // The window may cut a multi-byte character in half.
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&window[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return false,
    };

    text.trim_start_matches('\u{feff}')
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.contains(','))
        .unwrap_or(false)
}
