//! In-memory user/room directory for development and testing.
//!
//! Implements both collaborator ports the fanout core consumes:
//! [`RoomAccess`] and [`MessageStore`]. Production deployments wire the
//! account service's database-backed implementations instead.
//!
//! # Usage
//!
//! ```ignore
//! use chat_fanout::adapters::directory::InMemoryDirectory;
//!
//! let directory = InMemoryDirectory::new()
//!     .with_user(9, "alice")
//!     .with_room(5);
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use crate::domain::foundation::{RoomId, UserId};
use crate::ports::{AccessDenied, MessageStore, PersistError, RoomAccess};

/// A message accepted by [`InMemoryDirectory::persist_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: u64,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
}

/// Directory of users, rooms, private-room members and stored messages.
///
/// Public rooms admit every known user. Private rooms admit only their
/// listed members.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test and development use.
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, String>>,
    rooms: RwLock<HashMap<RoomId, Option<HashSet<UserId>>>>,
    messages: RwLock<Vec<StoredMessage>>,
    next_message_id: AtomicU64,
    fail_persist: AtomicBool,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
            messages: RwLock::new(Vec::new()),
            next_message_id: AtomicU64::new(1),
            fail_persist: AtomicBool::new(false),
        }
    }

    /// Add a user. Zero ids are ignored.
    pub fn with_user(self, user_id: u64, username: impl Into<String>) -> Self {
        if let Ok(id) = UserId::new(user_id) {
            self.users
                .write()
                .expect("InMemoryDirectory: users lock poisoned")
                .insert(id, username.into());
        }
        self
    }

    /// Add a public room. Zero ids are ignored.
    pub fn with_room(self, room_id: u64) -> Self {
        if let Ok(id) = RoomId::new(room_id) {
            self.rooms
                .write()
                .expect("InMemoryDirectory: rooms lock poisoned")
                .insert(id, None);
        }
        self
    }

    /// Add a private room restricted to `members`.
    pub fn with_private_room(self, room_id: u64, members: &[u64]) -> Self {
        if let Ok(id) = RoomId::new(room_id) {
            let members = members
                .iter()
                .filter_map(|m| UserId::new(*m).ok())
                .collect::<HashSet<_>>();
            self.rooms
                .write()
                .expect("InMemoryDirectory: rooms lock poisoned")
                .insert(id, Some(members));
        }
        self
    }

    /// Make every subsequent `persist_message` fail (for failure-path tests).
    pub fn set_persist_failing(&self, failing: bool) {
        self.fail_persist.store(failing, Ordering::SeqCst);
    }

    /// Messages stored so far, in insertion order.
    pub fn stored_messages(&self) -> Vec<StoredMessage> {
        self.messages
            .read()
            .expect("InMemoryDirectory: messages lock poisoned")
            .clone()
    }
}

#[async_trait]
impl RoomAccess for InMemoryDirectory {
    async fn authorize_user_for_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<String, AccessDenied> {
        let username = self
            .users
            .read()
            .expect("InMemoryDirectory: users lock poisoned")
            .get(&user_id)
            .cloned()
            .ok_or(AccessDenied::Unauthorized)?;

        let rooms = self
            .rooms
            .read()
            .expect("InMemoryDirectory: rooms lock poisoned");
        match rooms.get(&room_id) {
            None => Err(AccessDenied::RoomNotFound),
            Some(None) => Ok(username),
            Some(Some(members)) if members.contains(&user_id) => Ok(username),
            Some(Some(_)) => Err(AccessDenied::Unauthorized),
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryDirectory {
    async fn persist_message(
        &self,
        room_id: RoomId,
        user_id: UserId,
        content: &str,
    ) -> Result<u64, PersistError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("in-memory store offline".to_string()));
        }

        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.messages
            .write()
            .expect("InMemoryDirectory: messages lock poisoned")
            .push(StoredMessage {
                id,
                room_id,
                user_id,
                content: content.to_string(),
            });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: u64) -> RoomId {
        RoomId::new(id).unwrap()
    }

    fn user(id: u64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_user(1, "alice")
            .with_user(2, "bob")
            .with_room(5)
            .with_private_room(6, &[1])
    }

    #[tokio::test]
    async fn known_user_enters_public_room() {
        let username = directory()
            .authorize_user_for_room(user(2), room(5))
            .await
            .unwrap();
        assert_eq!(username, "bob");
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() {
        let result = directory().authorize_user_for_room(user(99), room(5)).await;
        assert_eq!(result, Err(AccessDenied::Unauthorized));
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let result = directory().authorize_user_for_room(user(1), room(404)).await;
        assert_eq!(result, Err(AccessDenied::RoomNotFound));
    }

    #[tokio::test]
    async fn private_room_admits_only_members() {
        let dir = directory();
        assert!(dir.authorize_user_for_room(user(1), room(6)).await.is_ok());
        assert_eq!(
            dir.authorize_user_for_room(user(2), room(6)).await,
            Err(AccessDenied::Unauthorized)
        );
    }

    #[tokio::test]
    async fn persist_assigns_increasing_ids() {
        let dir = directory();
        let first = dir.persist_message(room(5), user(1), "one").await.unwrap();
        let second = dir.persist_message(room(5), user(2), "two").await.unwrap();

        assert!(second > first);
        let stored = dir.stored_messages();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].content, "two");
    }

    #[tokio::test]
    async fn persist_failure_is_reported() {
        let dir = directory();
        dir.set_persist_failing(true);

        assert!(dir.persist_message(room(5), user(1), "x").await.is_err());
        assert!(dir.stored_messages().is_empty());
    }
}
