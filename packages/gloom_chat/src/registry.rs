//! Session Registry
//!
//! Binds each user identifier to its current connection and nickname.
//! A second index maps connection handles back to users so inbound events
//! can be attributed without scanning every session.

use std::collections::HashMap;

use crate::models::{ConnectionId, UserId};

/// One active participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub nickname: String,
}

#[derive(Debug)]
struct Entry {
    /// Position in registration order; kept when a user id is re-registered
    seq: u64,
    session: Session,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<UserId, Entry>,
    /// connection_id -> user ids bound to it, ordered by `seq`
    by_connection: HashMap<ConnectionId, Vec<UserId>>,
    next_seq: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the session for `user_id`. Returns the superseded
    /// session, if any. The superseded connection is not notified.
    ///
    /// Other user ids already bound to `connection_id` are left alone, so one
    /// connection may speak for several sessions.
    pub fn register(
        &mut self,
        user_id: &str,
        nickname: &str,
        connection_id: &str,
    ) -> Option<Session> {
        let existing = self
            .sessions
            .get(user_id)
            .map(|e| (e.seq, e.session.connection_id.clone()));
        let seq = match existing {
            Some((seq, old_connection)) => {
                self.unindex(&old_connection, user_id);
                seq
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };

        let session = Session {
            user_id: user_id.to_string(),
            connection_id: connection_id.to_string(),
            nickname: nickname.to_string(),
        };
        let replaced = self
            .sessions
            .insert(user_id.to_string(), Entry { seq, session })
            .map(|e| e.session);
        self.index(connection_id, user_id, seq);
        replaced
    }

    /// Resolve which session a connection speaks for. When several user ids
    /// share the connection, the earliest registered one wins.
    pub fn lookup_by_connection(&self, connection_id: &str) -> Option<&Session> {
        let user_id = self.by_connection.get(connection_id)?.first()?;
        self.sessions.get(user_id).map(|e| &e.session)
    }

    /// Delete the session for `user_id`, returning it if it existed.
    pub fn remove(&mut self, user_id: &str) -> Option<Session> {
        let entry = self.sessions.remove(user_id)?;
        self.unindex(&entry.session.connection_id, user_id);
        Some(entry.session)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn index(&mut self, connection_id: &str, user_id: &str, seq: u64) {
        let sessions = &self.sessions;
        let users = self
            .by_connection
            .entry(connection_id.to_string())
            .or_default();
        let at = users.partition_point(|u| sessions.get(u).is_some_and(|e| e.seq < seq));
        users.insert(at, user_id.to_string());
    }

    fn unindex(&mut self, connection_id: &str, user_id: &str) {
        if let Some(users) = self.by_connection.get_mut(connection_id) {
            users.retain(|u| u != user_id);
            if users.is_empty() {
                self.by_connection.remove(connection_id);
            }
        }
    }
}
