use std::{collections::HashMap, sync::Arc};

use log::*;
use tokio::sync::Mutex;

use crate::trip::TripState;

/// In-memory trips keyed by Discord user id.
///
/// Each trip sits behind its own lock and a command holds it for the whole
/// action, network calls included, so one user's actions apply in order
/// without blocking anyone else.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<u64, Arc<Mutex<TripState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    /// Returns the user's trip, starting an empty one on first use.
    pub async fn session(&self, user_id: u64) -> Arc<Mutex<TripState>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| {
                debug!("Starting trip session for user {}.", user_id);
                Arc::new(Mutex::new(TripState::default()))
            })
            .clone()
    }

    pub async fn discard(&self, user_id: u64) -> bool {
        self.sessions.lock().await.remove(&user_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
