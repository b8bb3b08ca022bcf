use std::env;
use std::time::Duration;

/// Import pipeline configuration
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Maximum size of a single-request file import in bytes (default: 10 MB)
    pub max_import_file_size: usize,

    /// Maximum size of a multi-sheet workbook in bytes (default: 50 MB)
    pub max_multi_sheet_file_size: usize,

    /// Maximum size of one uploaded chunk in bytes (default: 4 MB)
    pub max_chunk_size: usize,

    /// Maximum size of a reassembled chunked file in bytes (default: 50 MB)
    pub max_chunked_file_size: usize,

    /// Maximum data rows accepted from one file (default: 10000)
    pub max_rows_per_file: usize,

    /// Maximum records in one JSON import body (default: 5000)
    pub max_json_records: usize,

    /// Maximum rows in one streamed chunk (default: 500)
    pub max_rows_per_chunk: usize,

    /// Maximum declared chunk count for a session (default: 10000)
    pub max_total_chunks: u32,

    /// Batch size for single file imports (default: 50)
    pub file_batch_size: usize,

    /// Batch size for multi-sheet imports (default: 10)
    pub multi_sheet_batch_size: usize,

    /// Batch size for JSON imports (default: 25)
    pub json_batch_size: usize,

    /// Sub-batch size for streamed chunks (default: 5)
    pub stream_batch_size: usize,

    /// Bulk insert attempts per streamed sub-batch (default: 3)
    pub retry_max_attempts: u32,

    /// First backoff delay; doubles on every retry (default: 1000 ms)
    pub retry_base_delay_ms: u64,

    /// Pause between sequential batches (default: 100 ms)
    pub inter_batch_delay_ms: u64,

    /// Idle lifetime of an upload session (default: 900 s)
    pub session_ttl_secs: u64,

    /// How often the sweeper looks for idle sessions (default: 60 s)
    pub session_sweep_interval_secs: u64,

    /// Cap on errors listed in an import summary (default: 50)
    pub max_reported_errors: usize,

    /// Whether datastore error text reaches API responses (default: false)
    pub expose_error_details: bool,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_import_file_size: 10 * 1024 * 1024,     // 10 MB
            max_multi_sheet_file_size: 50 * 1024 * 1024, // 50 MB
            max_chunk_size: 4 * 1024 * 1024,            // 4 MB
            max_chunked_file_size: 50 * 1024 * 1024,    // 50 MB
            max_rows_per_file: 10_000,
            max_json_records: 5_000,
            max_rows_per_chunk: 500,
            max_total_chunks: 10_000,
            file_batch_size: 50,
            multi_sheet_batch_size: 10,
            json_batch_size: 25,
            stream_batch_size: 5,
            retry_max_attempts: 3,
            retry_base_delay_ms: 1_000,
            inter_batch_delay_ms: 100,
            session_ttl_secs: 15 * 60,
            session_sweep_interval_secs: 60,
            max_reported_errors: 50,
            expose_error_details: false,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| {
            let v = v.to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}

impl ImportConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_import_file_size: env_parse("MAX_IMPORT_FILE_SIZE", default.max_import_file_size),
            max_multi_sheet_file_size: env_parse(
                "MAX_MULTI_SHEET_FILE_SIZE",
                default.max_multi_sheet_file_size,
            ),
            max_chunk_size: env_parse("MAX_CHUNK_SIZE", default.max_chunk_size),
            max_chunked_file_size: env_parse(
                "MAX_CHUNKED_FILE_SIZE",
                default.max_chunked_file_size,
            ),
            max_rows_per_file: env_parse("MAX_ROWS_PER_FILE", default.max_rows_per_file),
            max_json_records: env_parse("MAX_JSON_RECORDS", default.max_json_records),
            max_rows_per_chunk: env_parse("MAX_ROWS_PER_CHUNK", default.max_rows_per_chunk),
            max_total_chunks: env_parse("MAX_TOTAL_CHUNKS", default.max_total_chunks),

            file_batch_size: env_parse("FILE_BATCH_SIZE", default.file_batch_size),
            multi_sheet_batch_size: env_parse(
                "MULTI_SHEET_BATCH_SIZE",
                default.multi_sheet_batch_size,
            ),
            json_batch_size: env_parse("JSON_BATCH_SIZE", default.json_batch_size),
            stream_batch_size: env_parse("STREAM_BATCH_SIZE", default.stream_batch_size),

            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS", default.retry_max_attempts),
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS", default.retry_base_delay_ms),
            inter_batch_delay_ms: env_parse("INTER_BATCH_DELAY_MS", default.inter_batch_delay_ms),

            session_ttl_secs: env_parse("SESSION_TTL_SECS", default.session_ttl_secs),
            session_sweep_interval_secs: env_parse(
                "SESSION_SWEEP_INTERVAL_SECS",
                default.session_sweep_interval_secs,
            ),

            max_reported_errors: env_parse("MAX_REPORTED_ERRORS", default.max_reported_errors),
            expose_error_details: env_flag("EXPOSE_ERROR_DETAILS", default.expose_error_details),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (fast retries, detailed errors)
    pub fn development() -> Self {
        Self {
            retry_base_delay_ms: 10,
            inter_batch_delay_ms: 0,
            expose_error_details: true,
            ..Self::default()
        }
    }

    /// Create config for production (full backoff, generic error messages)
    pub fn production() -> Self {
        Self {
            expose_error_details: false,
            ..Self::from_env()
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Largest body any import route accepts, plus multipart overhead.
    pub fn body_limit(&self) -> usize {
        self.max_import_file_size
            .max(self.max_multi_sheet_file_size)
            .max(self.max_chunk_size)
            + 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImportConfig::default();
        assert_eq!(config.max_import_file_size, 10 * 1024 * 1024);
        assert_eq!(config.retry_max_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 1_000);
        assert_eq!(config.session_ttl(), Duration::from_secs(900));
        assert!(!config.expose_error_details);
    }

    #[test]
    fn test_batch_sizes_within_bounds() {
        let config = ImportConfig::default();
        for size in [
            config.file_batch_size,
            config.multi_sheet_batch_size,
            config.json_batch_size,
            config.stream_batch_size,
        ] {
            assert!((3..=50).contains(&size), "batch size {} out of range", size);
        }
    }

    #[test]
    fn test_development_config() {
        let config = ImportConfig::development();
        assert!(config.expose_error_details);
        assert_eq!(config.inter_batch_delay_ms, 0);
        assert_eq!(config.file_batch_size, 50);
    }

    #[test]
    fn test_body_limit_covers_largest_route() {
        let config = ImportConfig::default();
        assert!(config.body_limit() > config.max_multi_sheet_file_size);
    }
}
