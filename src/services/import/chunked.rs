//! Multi-request uploads.
//!
//! Streamed chunks carry parsed rows and are written as they arrive, with
//! bulk retry. File chunks carry raw bytes that are reassembled and run
//! through the file pipeline once the last part lands. Either way a chunk
//! index is applied at most once per session.

use super::ImportService;
use super::error::ImportError;
use super::normalize::records_from_objects;
use super::report::ImportSummary;
use super::types::{Owner, RowError, SheetLayout, UploadedFile};
use crate::services::sessions::{SessionKind, UploadSession};
use crate::utils::validation::{validate_chunk_position, validate_file_size, validate_session_id};
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Missing chunk indices listed in a status response.
const MAX_LISTED_MISSING: usize = 100;

#[derive(Debug, Clone)]
pub struct StreamChunk {
    pub session_id: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub is_last_chunk: bool,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone)]
pub struct FileChunk {
    pub session_id: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub file: UploadedFile,
}

/// Response to one chunk submission.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkProgress {
    /// False only when every row of this chunk failed
    pub success: bool,
    pub session_id: String,
    pub chunk_index: u32,
    /// The index was already applied; nothing was written
    pub already_processed: bool,
    pub chunk_imported: usize,
    pub chunk_failed: usize,
    /// Cumulative over the session
    pub total_imported: usize,
    pub total_failed: usize,
    pub processed_chunks: usize,
    pub total_chunks: u32,
    pub complete: bool,
    pub errors: Vec<RowError>,
    /// Final summary of a reassembled file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ImportSummary>,
}

/// `GET /clients/import/sessions/:session_id`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_chunks: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_seconds: Option<u64>,
}

impl SessionStatus {
    pub fn missing() -> Self {
        Self {
            exists: false,
            session_id: None,
            kind: None,
            total_chunks: None,
            processed_chunks: None,
            missing_chunks: None,
            imported: None,
            failed: None,
            complete: None,
            idle_seconds: None,
        }
    }

    fn from_session(session_id: &str, session: &UploadSession) -> Self {
        Self {
            exists: true,
            session_id: Some(session_id.to_string()),
            kind: Some(session.kind.label().to_string()),
            total_chunks: Some(session.total_chunks),
            processed_chunks: Some(session.processed.len()),
            missing_chunks: Some(session.missing_chunks(MAX_LISTED_MISSING)),
            imported: Some(session.imported),
            failed: Some(session.total_failed()),
            complete: Some(session.is_complete()),
            idle_seconds: Some(session.last_activity.elapsed().as_secs()),
        }
    }
}

fn progress(session_id: &str, chunk_index: u32, session: &UploadSession) -> ChunkProgress {
    ChunkProgress {
        success: true,
        session_id: session_id.to_string(),
        chunk_index,
        already_processed: false,
        chunk_imported: 0,
        chunk_failed: 0,
        total_imported: session.imported,
        total_failed: session.total_failed(),
        processed_chunks: session.processed.len(),
        total_chunks: session.total_chunks,
        complete: session.is_complete(),
        errors: Vec::new(),
        summary: None,
    }
}

/// Why an existing session cannot take this chunk, if it cannot.
fn conflict(
    session: &UploadSession,
    owner: &Owner,
    total_chunks: u32,
    wants_file: bool,
) -> Option<String> {
    if session.owner != *owner {
        return Some("session belongs to another user".to_string());
    }
    if session.total_chunks != total_chunks {
        return Some(format!(
            "totalChunks changed from {} to {}",
            session.total_chunks, total_chunks
        ));
    }
    let is_file = matches!(session.kind, SessionKind::File { .. });
    if is_file != wants_file {
        return Some(format!(
            "session is a {} upload",
            session.kind.label()
        ));
    }
    None
}

impl ImportService {
    /// Applies one chunk of pre-parsed rows.
    ///
    /// A chunk whose rows all failed stays unprocessed so the client may
    /// resend it; its failures are counted until a retry succeeds.
    pub async fn process_stream_chunk(
        &self,
        owner: &Owner,
        chunk: StreamChunk,
    ) -> Result<ChunkProgress, ImportError> {
        validate_session_id(&chunk.session_id)?;
        validate_chunk_position(
            chunk.chunk_index,
            chunk.total_chunks,
            self.config.max_total_chunks,
        )?;
        if chunk.rows.len() > self.config.max_rows_per_chunk {
            return Err(ImportError::TooManyRows {
                count: chunk.rows.len(),
                limit: self.config.max_rows_per_chunk,
            });
        }

        let session_id = chunk.session_id.as_str();
        let index = chunk.chunk_index;
        let _guard = self.sessions.lock(session_id).await;

        let state = self.sessions.update(session_id, |s| {
            conflict(s, owner, chunk.total_chunks, false)
                .map(Err)
                .unwrap_or_else(|| Ok(s.processed.contains(&index)))
        });
        match state {
            None => {
                tracing::info!(
                    "🆕 Stream session {} opened: {} chunk(s)",
                    session_id,
                    chunk.total_chunks
                );
                self.sessions.insert(
                    session_id,
                    UploadSession::new(
                        owner.clone(),
                        chunk.total_chunks,
                        SessionKind::Rows {
                            unsettled_failures: BTreeMap::new(),
                        },
                    ),
                );
            }
            Some(Err(reason)) => return Err(ImportError::SessionConflict(reason)),
            Some(Ok(true)) => {
                tracing::info!("♻️ Chunk {} of {} already processed", index, session_id);
                return self
                    .sessions
                    .update(session_id, |s| ChunkProgress {
                        already_processed: true,
                        ..progress(session_id, index, s)
                    })
                    .ok_or_else(|| ImportError::Internal("session vanished".to_string()));
            }
            Some(Ok(false)) => {}
        }

        let records = records_from_objects(&chunk.rows, owner, 1);
        let result = self.stream_writer().write(&records).await;

        let settled = result.succeeded > 0 || result.total() == 0;
        let chunk_errors: Vec<RowError> = result
            .errors
            .iter()
            .cloned()
            .map(|e| RowError {
                chunk: Some(index),
                ..e
            })
            .collect();
        let max_errors = self.config.max_reported_errors;

        let updated = self.sessions.update(session_id, |s| {
            s.errors.retain(|e| e.chunk != Some(index));
            let room = max_errors.saturating_sub(s.errors.len());
            s.errors.extend(chunk_errors.iter().take(room).cloned());

            if let SessionKind::Rows { unsettled_failures } = &mut s.kind {
                unsettled_failures.remove(&index);
                if settled {
                    s.processed.insert(index);
                    s.imported += result.succeeded;
                    s.failed += result.failed;
                } else {
                    unsettled_failures.insert(index, result.failed);
                }
            }
            progress(session_id, index, s)
        });
        let mut progress =
            updated.ok_or_else(|| ImportError::Internal("session vanished".to_string()))?;

        progress.success = settled;
        progress.chunk_imported = result.succeeded;
        progress.chunk_failed = result.failed;
        progress.errors = self.reporter.present_errors(chunk_errors);

        if progress.complete {
            tracing::info!(
                "✅ Stream session {} complete: {} saved, {} failed",
                session_id,
                progress.total_imported,
                progress.total_failed
            );
        } else if chunk.is_last_chunk {
            tracing::warn!(
                "⚠️ Last chunk of {} received with {} of {} chunk(s) processed",
                session_id,
                progress.processed_chunks,
                progress.total_chunks
            );
        }

        Ok(progress)
    }

    /// Stores one byte range of a file; runs the import once all parts are in.
    pub async fn process_file_chunk(
        &self,
        owner: &Owner,
        chunk: FileChunk,
    ) -> Result<ChunkProgress, ImportError> {
        validate_session_id(&chunk.session_id)?;
        validate_chunk_position(
            chunk.chunk_index,
            chunk.total_chunks,
            self.config.max_total_chunks,
        )?;
        validate_file_size(chunk.file.data.len(), self.config.max_chunk_size)?;

        let session_id = chunk.session_id.as_str();
        let index = chunk.chunk_index;
        let _guard = self.sessions.lock(session_id).await;

        let state = self.sessions.update(session_id, |s| {
            conflict(s, owner, chunk.total_chunks, true)
                .map(Err)
                .unwrap_or_else(|| Ok(s.processed.contains(&index)))
        });
        match state {
            None => {
                tracing::info!(
                    "🆕 Chunked upload {} opened: '{}', {} chunk(s)",
                    session_id,
                    chunk.file.file_name,
                    chunk.total_chunks
                );
                self.sessions.insert(
                    session_id,
                    UploadSession::new(
                        owner.clone(),
                        chunk.total_chunks,
                        SessionKind::File {
                            file_name: chunk.file.file_name.clone(),
                            content_type: chunk.file.content_type.clone(),
                            parts: BTreeMap::new(),
                            received_bytes: 0,
                            summary: None,
                        },
                    ),
                );
            }
            Some(Err(reason)) => return Err(ImportError::SessionConflict(reason)),
            Some(Ok(true)) => {
                return self
                    .sessions
                    .update(session_id, |s| {
                        let summary = match &s.kind {
                            SessionKind::File { summary, .. } => summary.clone(),
                            SessionKind::Rows { .. } => None,
                        };
                        ChunkProgress {
                            already_processed: true,
                            summary,
                            ..progress(session_id, index, s)
                        }
                    })
                    .ok_or_else(|| ImportError::Internal("session vanished".to_string()));
            }
            Some(Ok(false)) => {}
        }

        let limit = self.config.max_chunked_file_size;
        let stored = self.sessions.update(session_id, |s| {
            let SessionKind::File {
                parts,
                received_bytes,
                ..
            } = &mut s.kind
            else {
                return Err(ImportError::SessionConflict("session is a rows upload".to_string()));
            };
            let size = *received_bytes + chunk.file.data.len();
            if size > limit {
                return Err(ImportError::FileTooLarge { size, limit });
            }
            *received_bytes = size;
            parts.insert(index, chunk.file.data.clone());
            s.processed.insert(index);
            Ok(progress(session_id, index, s))
        });

        let progress = match stored {
            Some(Ok(progress)) => progress,
            Some(Err(e)) => {
                // An oversized file can never complete; drop what was received.
                if matches!(e, ImportError::FileTooLarge { .. }) {
                    self.sessions.remove(session_id);
                }
                return Err(e);
            }
            None => return Err(ImportError::Internal("session vanished".to_string())),
        };

        if !progress.complete {
            tracing::debug!(
                "📦 Chunk {}/{} stored for {}",
                progress.processed_chunks,
                progress.total_chunks,
                session_id
            );
            return Ok(progress);
        }

        let file = self
            .sessions
            .update(session_id, assemble)
            .flatten()
            .ok_or_else(|| ImportError::Internal("assembled file missing".to_string()))?;

        tracing::info!(
            "🧩 Reassembled '{}' ({} bytes) from {} chunk(s)",
            file.file_name,
            file.data.len(),
            progress.total_chunks
        );

        let summary = match self.run_file_pipeline(owner, file, SheetLayout::Auto).await {
            Ok(summary) => summary,
            Err(e) => {
                self.sessions.remove(session_id);
                return Err(e);
            }
        };

        self.sessions.update(session_id, |s| {
            s.imported = summary.imported;
            s.failed = summary.failed;
            s.errors = summary.errors.clone();
            if let SessionKind::File { summary: stored, .. } = &mut s.kind {
                *stored = Some(summary.clone());
            }
        });

        Ok(ChunkProgress {
            success: summary.success,
            chunk_imported: summary.imported,
            chunk_failed: summary.failed,
            total_imported: summary.imported,
            total_failed: summary.failed,
            errors: summary.errors.clone(),
            summary: Some(summary),
            ..progress
        })
    }

    /// Status of a session, as seen by `owner`. Sessions of other owners
    /// are indistinguishable from unknown ones.
    pub fn session_status(
        &self,
        owner: &Owner,
        session_id: &str,
    ) -> Result<SessionStatus, ImportError> {
        validate_session_id(session_id)?;
        Ok(self
            .sessions
            .read(session_id, |s| {
                (s.owner == *owner).then(|| SessionStatus::from_session(session_id, s))
            })
            .flatten()
            .unwrap_or_else(SessionStatus::missing))
    }
}

/// Concatenates stored parts in index order and releases them.
fn assemble(session: &mut UploadSession) -> Option<UploadedFile> {
    let SessionKind::File {
        file_name,
        content_type,
        parts,
        received_bytes,
        ..
    } = &mut session.kind
    else {
        return None;
    };

    let mut buffer = BytesMut::with_capacity(*received_bytes);
    for part in std::mem::take(parts).into_values() {
        buffer.extend_from_slice(&part);
    }
    let data: Bytes = buffer.freeze();

    Some(UploadedFile {
        file_name: file_name.clone(),
        content_type: content_type.clone(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::services::import::writer::tests::MockClientStore;
    use crate::services::sessions::UploadSessionStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    const SESSION: &str = "stream-session-01";

    fn owner() -> Owner {
        Owner {
            user_id: "coach-1".to_string(),
            organization_id: Some("gym-1".to_string()),
        }
    }

    fn service(store: Arc<MockClientStore>) -> ImportService {
        let mut config = ImportConfig::development();
        config.retry_base_delay_ms = 1;
        ImportService::new(store, UploadSessionStore::new(), config)
    }

    fn rows(names: &[&str]) -> Vec<Map<String, Value>> {
        names
            .iter()
            .filter_map(|n| json!({ "name": n }).as_object().cloned())
            .collect()
    }

    fn stream_chunk(index: u32, total: u32, names: &[&str]) -> StreamChunk {
        StreamChunk {
            session_id: SESSION.to_string(),
            chunk_index: index,
            total_chunks: total,
            is_last_chunk: index + 1 == total,
            rows: rows(names),
        }
    }

    fn file_chunk(index: u32, total: u32, data: &'static str) -> FileChunk {
        FileChunk {
            session_id: "file-session-01".to_string(),
            chunk_index: index,
            total_chunks: total,
            file: UploadedFile {
                file_name: "clients.csv".to_string(),
                content_type: Some("text/csv".to_string()),
                data: Bytes::from_static(data.as_bytes()),
            },
        }
    }

    #[tokio::test]
    async fn test_duplicate_chunk_is_applied_once() {
        let store = Arc::new(MockClientStore::default());
        let service = service(store.clone());

        let first = service
            .process_stream_chunk(&owner(), stream_chunk(0, 2, &["Ann", "Bo"]))
            .await
            .unwrap();
        assert!(!first.already_processed);
        assert_eq!(first.chunk_imported, 2);

        let again = service
            .process_stream_chunk(&owner(), stream_chunk(0, 2, &["Ann", "Bo"]))
            .await
            .unwrap();
        assert!(again.already_processed);
        assert_eq!(again.total_imported, 2);
        assert_eq!(again.chunk_imported, 0);
        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.saved_names(), vec!["Ann", "Bo"]);
    }

    #[tokio::test]
    async fn test_sweep_during_write_keeps_session() {
        let store = Arc::new(MockClientStore::default());
        let mut config = ImportConfig::development();
        config.retry_base_delay_ms = 300;
        let sessions = UploadSessionStore::new();
        let service = Arc::new(ImportService::new(store.clone(), sessions.clone(), config));

        service
            .process_stream_chunk(&owner(), stream_chunk(0, 2, &["P0"]))
            .await
            .unwrap();

        // The next bulk insert fails once, so chunk 1 sits in retry backoff.
        store.flaky_batches.store(1, Ordering::SeqCst);
        let writer = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .process_stream_chunk(&owner(), stream_chunk(1, 2, &["P1"]))
                    .await
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(sessions.sweep(std::time::Duration::ZERO), 0);

        let progress = writer.await.unwrap().unwrap();
        assert_eq!(progress.chunk_imported, 1);
        assert!(progress.complete);

        let again = service
            .process_stream_chunk(&owner(), stream_chunk(1, 2, &["P1"]))
            .await
            .unwrap();
        assert!(again.already_processed);
        assert_eq!(store.saved_names(), vec!["P0", "P1"]);
    }

    #[tokio::test]
    async fn test_chunk_refreshes_idle_session() {
        let store = Arc::new(MockClientStore::default());
        let sessions = UploadSessionStore::new();
        let service = ImportService::new(store, sessions.clone(), ImportConfig::development());

        service
            .process_stream_chunk(&owner(), stream_chunk(0, 2, &["Q0"]))
            .await
            .unwrap();
        sessions.update(SESSION, |s| {
            s.last_activity = std::time::Instant::now() - std::time::Duration::from_secs(120);
        });

        service
            .process_stream_chunk(&owner(), stream_chunk(0, 2, &["Q0"]))
            .await
            .unwrap();
        assert_eq!(sessions.sweep(std::time::Duration::from_secs(60)), 0);
        assert!(sessions.contains(SESSION));
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_insert_once() {
        let store = Arc::new(MockClientStore::default());
        let service = Arc::new(service(store.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .process_stream_chunk(&owner(), stream_chunk(1, 3, &["Cy"]))
                        .await
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if !handle.await.unwrap().unwrap().already_processed {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(store.saved_names(), vec!["Cy"]);
    }

    #[tokio::test]
    async fn test_stream_session_completes() {
        let store = Arc::new(MockClientStore::default());
        let service = service(store);

        service
            .process_stream_chunk(&owner(), stream_chunk(1, 2, &["Bo", "BAD"]))
            .await
            .unwrap();
        let last = service
            .process_stream_chunk(&owner(), stream_chunk(0, 2, &["Ann"]))
            .await
            .unwrap();

        assert!(last.complete);
        assert_eq!(last.total_imported, 2);
        assert_eq!(last.total_failed, 1);

        let status = service.session_status(&owner(), SESSION).unwrap();
        assert!(status.exists);
        assert_eq!(status.complete, Some(true));
        assert_eq!(status.missing_chunks, Some(vec![]));
    }

    #[tokio::test]
    async fn test_fully_failed_chunk_can_be_resent() {
        let store = Arc::new(MockClientStore::default());
        let service = service(store.clone());

        let failed = service
            .process_stream_chunk(&owner(), stream_chunk(0, 1, &["BAD one"]))
            .await
            .unwrap();
        assert!(!failed.success);
        assert!(!failed.complete);
        assert_eq!(failed.total_failed, 1);
        assert_eq!(failed.errors[0].chunk, Some(0));

        let retried = service
            .process_stream_chunk(&owner(), stream_chunk(0, 1, &["Fixed one"]))
            .await
            .unwrap();
        assert!(retried.success);
        assert!(retried.complete);
        assert_eq!(retried.total_failed, 0);
        assert_eq!(retried.total_imported, 1);
    }

    #[tokio::test]
    async fn test_stream_retries_transient_failures() {
        let store = Arc::new(MockClientStore::flaky(2));
        let service = service(store.clone());

        let progress = service
            .process_stream_chunk(&owner(), stream_chunk(0, 1, &["Ann"]))
            .await
            .unwrap();

        assert_eq!(progress.chunk_imported, 1);
        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.single_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chunk_validation() {
        let service = service(Arc::new(MockClientStore::default()));

        let mut bad_id = stream_chunk(0, 1, &["Ann"]);
        bad_id.session_id = "short".to_string();
        assert!(matches!(
            service.process_stream_chunk(&owner(), bad_id).await,
            Err(ImportError::InvalidSessionId)
        ));

        assert!(matches!(
            service.process_stream_chunk(&owner(), stream_chunk(2, 2, &["Ann"])).await,
            Err(ImportError::InvalidRequest(_))
        ));

        let names: Vec<String> = (0..501).map(|i| format!("client {}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert!(matches!(
            service.process_stream_chunk(&owner(), stream_chunk(0, 1, &names)).await,
            Err(ImportError::TooManyRows { count: 501, .. })
        ));
    }

    #[tokio::test]
    async fn test_session_conflicts() {
        let service = service(Arc::new(MockClientStore::default()));
        service
            .process_stream_chunk(&owner(), stream_chunk(0, 3, &["Ann"]))
            .await
            .unwrap();

        assert!(matches!(
            service.process_stream_chunk(&owner(), stream_chunk(1, 4, &["Bo"])).await,
            Err(ImportError::SessionConflict(_))
        ));

        let stranger = Owner {
            user_id: "coach-2".to_string(),
            organization_id: None,
        };
        assert!(matches!(
            service.process_stream_chunk(&stranger, stream_chunk(1, 3, &["Bo"])).await,
            Err(ImportError::SessionConflict(_))
        ));
        assert!(!service.session_status(&stranger, SESSION).unwrap().exists);
    }

    #[tokio::test]
    async fn test_unknown_session_status() {
        let service = service(Arc::new(MockClientStore::default()));
        let status = service.session_status(&owner(), "no-such-session").unwrap();
        assert_eq!(status, SessionStatus::missing());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, json!({ "exists": false }));
    }

    #[tokio::test]
    async fn test_file_chunks_reassemble_out_of_order() {
        let store = Arc::new(MockClientStore::default());
        let service = service(store.clone());

        let second = service
            .process_file_chunk(&owner(), file_chunk(1, 2, "Bo,bo@example.com\nCy,\n"))
            .await
            .unwrap();
        assert!(!second.complete);
        assert!(second.summary.is_none());

        let first = service
            .process_file_chunk(&owner(), file_chunk(0, 2, "Name,Email\nAnn,ann@example.com\n"))
            .await
            .unwrap();
        assert!(first.complete);
        let summary = first.summary.unwrap();
        assert_eq!(summary.imported, 3);
        assert_eq!(store.saved_names(), vec!["Ann", "Bo", "Cy"]);

        let replay = service
            .process_file_chunk(&owner(), file_chunk(1, 2, "Bo,bo@example.com\nCy,\n"))
            .await
            .unwrap();
        assert!(replay.already_processed);
        assert_eq!(replay.summary.map(|s| s.imported), Some(3));
        assert_eq!(store.saved_names().len(), 3);
    }

    #[tokio::test]
    async fn test_reassembled_size_limit() {
        let store = Arc::new(MockClientStore::default());
        let mut config = ImportConfig::development();
        config.max_chunked_file_size = 20;
        let service = ImportService::new(store, UploadSessionStore::new(), config);

        service
            .process_file_chunk(&owner(), file_chunk(0, 3, "Name,Email\nAnn,\n"))
            .await
            .unwrap();
        let err = service
            .process_file_chunk(&owner(), file_chunk(1, 3, "Bo,bo@example.com\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::FileTooLarge { .. }));
        assert!(!service.sessions().contains("file-session-01"));
    }
}
