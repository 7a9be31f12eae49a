//! Thread-safe map of live calibration sessions.
//!
//! A service front end can run several calibrations at once; each session
//! sits behind its own mutex so operations on one session are serialized
//! while different sessions proceed independently.

use crate::error::CalibrationError;
use crate::session::{CalibrationSession, SessionOptions};
use crate::target::CalibrationTarget;
use log::info;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

pub type SharedSession = Arc<Mutex<CalibrationSession>>;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and register it.
    pub fn create(
        &self,
        target: CalibrationTarget,
        options: SessionOptions,
    ) -> Result<SessionId, CalibrationError> {
        let session = CalibrationSession::with_options(target, options)?;
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(session)));
        info!("{id} started");
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn remove(&self, id: SessionId) -> Option<SharedSession> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            info!("{id} closed");
        }
        removed
    }

    /// Run `f` with exclusive access to session `id`.
    pub fn with_session<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut CalibrationSession) -> R,
    ) -> Option<R> {
        let shared = self.get(id)?;
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut guard))
    }

    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
