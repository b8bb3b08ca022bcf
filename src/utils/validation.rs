use crate::services::import::error::ImportError;

pub const SESSION_ID_MIN_LEN: usize = 10;
pub const SESSION_ID_MAX_LEN: usize = 50;

const MAX_FILENAME_BYTES: usize = 255;

/// Validates an upload size against its route limit.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ImportError> {
    if size == 0 {
        return Err(ImportError::EmptyFile);
    }
    if size > max_size {
        return Err(ImportError::FileTooLarge {
            size,
            limit: max_size,
        });
    }
    Ok(())
}

/// Session ids are client-chosen: 10-50 of `[A-Za-z0-9_-]`.
pub fn validate_session_id(id: &str) -> Result<(), ImportError> {
    let len_ok = (SESSION_ID_MIN_LEN..=SESSION_ID_MAX_LEN).contains(&id.len());
    let chars_ok = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(ImportError::InvalidSessionId)
    }
}

/// Checks `chunk_index < total_chunks <= max_total`.
pub fn validate_chunk_position(
    chunk_index: u32,
    total_chunks: u32,
    max_total: u32,
) -> Result<(), ImportError> {
    if total_chunks == 0 || total_chunks > max_total {
        return Err(ImportError::InvalidRequest(format!(
            "totalChunks must be between 1 and {}",
            max_total
        )));
    }
    if chunk_index >= total_chunks {
        return Err(ImportError::InvalidRequest(format!(
            "chunkIndex {} is out of range for {} chunk(s)",
            chunk_index, total_chunks
        )));
    }
    Ok(())
}

/// Reduces a client-supplied file name to a safe display name.
/// Directory parts are dropped and reserved characters replaced.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if filename.contains("..") {
        tracing::warn!("Path components stripped from upload name: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';') {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut end = sanitized.len().min(MAX_FILENAME_BYTES);
    while !sanitized.is_char_boundary(end) {
        end -= 1;
    }

    match sanitized[..end].trim_start_matches('.') {
        "" => "upload".to_string(),
        cleaned => cleaned.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(1024, 2048).is_ok());
        assert!(validate_file_size(2048, 2048).is_ok());
        assert!(matches!(
            validate_file_size(2049, 2048),
            Err(ImportError::FileTooLarge { size: 2049, limit: 2048 })
        ));
        assert!(matches!(validate_file_size(0, 2048), Err(ImportError::EmptyFile)));
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("abc_DEF-0123").is_ok());
        assert!(validate_session_id(&"a".repeat(50)).is_ok());
        assert!(validate_session_id("short").is_err());
        assert!(validate_session_id(&"a".repeat(51)).is_err());
        assert!(validate_session_id("has space 12345").is_err());
        assert!(validate_session_id("../../etc/passwd").is_err());
        assert!(validate_session_id("ünïcode-session").is_err());
    }

    #[test]
    fn test_validate_chunk_position() {
        assert!(validate_chunk_position(0, 1, 10_000).is_ok());
        assert!(validate_chunk_position(9_999, 10_000, 10_000).is_ok());
        assert!(validate_chunk_position(0, 0, 10_000).is_err());
        assert!(validate_chunk_position(0, 10_001, 10_000).is_err());
        assert!(validate_chunk_position(3, 3, 10_000).is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("clients.xlsx"), "clients.xlsx");
        assert_eq!(sanitize_filename("my <clients>.csv"), "my _clients_.csv");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\roster.csv"), "roster.csv");
        assert_eq!(sanitize_filename("名簿.xlsx"), "名簿.xlsx");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".csv"), "csv");
    }
}
