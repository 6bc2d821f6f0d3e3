//! In-memory sources for exercising the aggregation pipeline.

use crate::{
    directory::{DirectoryConnection, DirectoryRecord, DirectorySource},
    duo::{AccountStatus, MfaRecord, MfaSource},
    error::SourceError,
};
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

pub fn mfa_record(username: &str) -> MfaRecord {
    MfaRecord {
        user_id: format!("DU-{username}"),
        username: username.to_string(),
        firstname: Some("Jane".to_string()),
        lastname: Some("Doe".to_string()),
        realname: Some("Jane Doe".to_string()),
        email: Some(format!("{username}@example.com")),
        title: None,
        status: AccountStatus::Active,
        is_enrolled: true,
        created: Some(1_489_612_729),
        last_directory_sync: None,
        last_login: Some(1_700_000_000),
        phones: Some(Vec::new()),
        tokens: Some(Vec::new()),
        webauthncredentials: Vec::new(),
        bypass_codes: Vec::new(),
    }
}

pub fn directory_record(groups: &[&str]) -> DirectoryRecord {
    DirectoryRecord {
        groups: groups.iter().map(|g| (*g).to_string()).collect(),
        ..DirectoryRecord::default()
    }
}

/// MFA source answering from a fixed record; `None` behaves like an unknown user.
#[derive(Default)]
pub struct FakeMfa {
    pub record: Option<MfaRecord>,
    pub error: Option<fn() -> SourceError>,
    pub calls: AtomicU32,
}

impl FakeMfa {
    pub fn with(record: MfaRecord) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    pub fn failing(error: fn() -> SourceError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MfaSource for FakeMfa {
    async fn lookup(&self, username: &str) -> Result<MfaRecord, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.error {
            return Err(error());
        }
        self.record
            .clone()
            .ok_or_else(|| SourceError::NotFound(username.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct FakeDirectory {
    pub record: Option<DirectoryRecord>,
    pub search_error: Option<fn() -> SourceError>,
    pub unreachable: bool,
    pub searches: Arc<AtomicU32>,
    pub connections: Arc<AtomicU32>,
    pub unbinds: Arc<AtomicU32>,
    pub dropped: Arc<AtomicU32>,
}

impl FakeDirectory {
    pub fn with(record: DirectoryRecord) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing(error: fn() -> SourceError) -> Self {
        Self {
            search_error: Some(error),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn searches(&self) -> u32 {
        self.searches.load(Ordering::SeqCst)
    }

    /// Connections released through `close`.
    pub fn unbinds(&self) -> u32 {
        self.unbinds.load(Ordering::SeqCst)
    }

    pub fn open_connections(&self) -> u32 {
        self.connections.load(Ordering::SeqCst) - self.dropped.load(Ordering::SeqCst)
    }
}

pub struct FakeConnection {
    directory: FakeDirectory,
}

impl DirectorySource for FakeDirectory {
    type Connection = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection, SourceError> {
        if self.unreachable {
            return Err(SourceError::Unavailable("connection refused".to_string()));
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConnection {
            directory: self.clone(),
        })
    }
}

impl DirectoryConnection for FakeConnection {
    async fn search(&self, username: &str) -> Result<DirectoryRecord, SourceError> {
        self.directory.searches.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.directory.search_error {
            return Err(error());
        }
        self.directory
            .record
            .clone()
            .ok_or_else(|| SourceError::NotFound(username.to_string()))
    }

    async fn close(self) {
        self.directory.unbinds.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.directory.dropped.fetch_add(1, Ordering::SeqCst);
    }
}
