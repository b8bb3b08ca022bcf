//! In-memory upload sessions used to reassemble chunked and streamed imports.
//!
//! Sessions live only in this process. Every mutation of one session happens
//! under its [`KeyedMutex`] guard; the map itself is only touched through
//! short synchronous closures, so no shard lock is ever held across an await.

use crate::services::import::report::ImportSummary;
use crate::services::import::types::{Owner, RowError};
use crate::utils::keyed_mutex::KeyedMutex;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Clone)]
pub enum SessionKind {
    /// Rows posted as JSON, imported chunk by chunk
    Rows {
        /// Failures of chunks that have not yet succeeded, by index
        unsettled_failures: BTreeMap<u32, usize>,
    },
    /// Raw file bytes, imported once every part has arrived
    File {
        file_name: String,
        content_type: Option<String>,
        parts: BTreeMap<u32, Bytes>,
        received_bytes: usize,
        summary: Option<ImportSummary>,
    },
}

impl SessionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Rows { .. } => "rows",
            SessionKind::File { .. } => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    pub owner: Owner,
    pub total_chunks: u32,
    pub processed: BTreeSet<u32>,
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
    pub kind: SessionKind,
    pub last_activity: Instant,
}

impl UploadSession {
    pub fn new(owner: Owner, total_chunks: u32, kind: SessionKind) -> Self {
        Self {
            owner,
            total_chunks,
            processed: BTreeSet::new(),
            imported: 0,
            failed: 0,
            errors: Vec::new(),
            kind,
            last_activity: Instant::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed.len() as u64 >= u64::from(self.total_chunks)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Failures including chunks still awaiting a successful retry.
    pub fn total_failed(&self) -> usize {
        match &self.kind {
            SessionKind::Rows { unsettled_failures } => {
                self.failed + unsettled_failures.values().sum::<usize>()
            }
            SessionKind::File { .. } => self.failed,
        }
    }

    /// Indices not yet processed, lowest first, at most `limit` of them.
    pub fn missing_chunks(&self, limit: usize) -> Vec<u32> {
        (0..self.total_chunks)
            .filter(|idx| !self.processed.contains(idx))
            .take(limit)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadSessionStore {
    sessions: Arc<DashMap<String, UploadSession>>,
    locks: KeyedMutex,
}

impl UploadSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialises work on one session id.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(session_id).await
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn insert(&self, session_id: &str, session: UploadSession) {
        self.sessions.insert(session_id.to_string(), session);
    }

    pub fn remove(&self, session_id: &str) -> Option<UploadSession> {
        self.sessions.remove(session_id).map(|(_, session)| session)
    }

    /// Reads a session without cloning it.
    pub fn read<R>(&self, session_id: &str, f: impl FnOnce(&UploadSession) -> R) -> Option<R> {
        self.sessions.get(session_id).map(|entry| f(entry.value()))
    }

    /// Mutates a session in place and refreshes its activity time.
    pub fn update<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut UploadSession) -> R,
    ) -> Option<R> {
        self.sessions.get_mut(session_id).map(|mut entry| {
            let session = entry.value_mut();
            session.touch();
            f(session)
        })
    }

    /// Removes sessions idle for at least `ttl` and prunes unused locks.
    /// A session whose lock is held or awaited is kept, however idle.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|session_id, session| {
            session.last_activity.elapsed() < ttl || self.locks.is_busy(session_id)
        });
        let removed = before.saturating_sub(self.sessions.len());
        self.locks.prune();
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
