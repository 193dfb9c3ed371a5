//! ============================================================================
//! Collection Browser - Paginated view over one rarity of a collection
//! ============================================================================
//! A session is a snapshot of the user's items of the chosen rarity plus a
//! cursor. Sessions are keyed by (user, chat), replaced when a new rarity is
//! chosen, and dropped after sitting idle past the TTL.
//! ============================================================================

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::types::{OwnedItem, Rarity, UserRecord};

/// Default idle time before a browse session is discarded
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// Maximum number of live sessions to prevent unbounded growth
const MAX_SESSIONS: usize = 1000;

/// Browsing context: one user in one chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: i64,
    pub chat_id: i64,
}

impl SessionKey {
    pub fn new(user_id: i64, chat_id: i64) -> Self {
        Self { user_id, chat_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Prev,
    Next,
}

/// Snapshot of matching items and the current position
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseSession {
    rarity: Rarity,
    items: Vec<OwnedItem>,
    index: usize,
    last_active: DateTime<Utc>,
}

impl BrowseSession {
    /// Start at the first item; `None` when there is nothing to show
    pub fn open(rarity: Rarity, items: Vec<OwnedItem>, now: DateTime<Utc>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            rarity,
            items,
            index: 0,
            last_active: now,
        })
    }

    pub fn rarity(&self) -> Rarity {
        self.rarity
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current(&self) -> &OwnedItem {
        &self.items[self.index]
    }

    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.items.len()
    }

    /// Move the cursor; returns false and stays put when the move is unavailable
    pub fn navigate(&mut self, nav: Navigation) -> bool {
        match nav {
            Navigation::Prev if self.has_prev() => self.index -= 1,
            Navigation::Next if self.has_next() => self.index += 1,
            _ => return false,
        }
        true
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = now;
    }
}

/// Outcome of picking a rarity
#[derive(Debug, PartialEq)]
pub enum RarityChoice<'a> {
    /// No items of that rarity; no session is kept
    Empty(Rarity),
    Viewing(&'a BrowseSession),
}

/// Outcome of a prev/next press
#[derive(Debug, PartialEq)]
pub enum NavOutcome<'a> {
    /// No live session for this user and chat
    NoSession,
    /// Cursor already at the edge in that direction
    Unavailable(&'a BrowseSession),
    Moved(&'a BrowseSession),
}

/// Live browse sessions
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionKey, BrowseSession>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Replace any session for `key` with a fresh snapshot of `record`'s items
    pub fn choose_rarity(
        &mut self,
        key: SessionKey,
        record: Option<&UserRecord>,
        rarity: Rarity,
        now: DateTime<Utc>,
    ) -> RarityChoice<'_> {
        self.sessions.remove(&key);
        self.expire_idle(now);

        let items = record.map(|r| r.items_of(rarity)).unwrap_or_default();
        let Some(session) = BrowseSession::open(rarity, items, now) else {
            debug!("No {} items for user {}", rarity, key.user_id);
            return RarityChoice::Empty(rarity);
        };

        if self.sessions.len() >= MAX_SESSIONS {
            self.evict_oldest();
        }

        debug!(
            "Opened {} session for user {} in chat {} ({} items)",
            rarity,
            key.user_id,
            key.chat_id,
            session.len()
        );
        RarityChoice::Viewing(self.sessions.entry(key).or_insert(session))
    }

    pub fn navigate(&mut self, key: SessionKey, nav: Navigation, now: DateTime<Utc>) -> NavOutcome<'_> {
        self.expire_idle(now);

        let Some(session) = self.sessions.get_mut(&key) else {
            return NavOutcome::NoSession;
        };
        session.touch(now);
        if session.navigate(nav) {
            NavOutcome::Moved(session)
        } else {
            NavOutcome::Unavailable(session)
        }
    }

    pub fn get(&self, key: &SessionKey) -> Option<&BrowseSession> {
        self.sessions.get(key)
    }

    /// End a session explicitly
    pub fn close(&mut self, key: &SessionKey) -> bool {
        self.sessions.remove(key).is_some()
    }

    /// Drop sessions idle for longer than the TTL; returns how many went
    pub fn expire_idle(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, s| now - s.last_active <= ttl);
        let expired = before - self.sessions.len();
        if expired > 0 {
            debug!("Expired {} idle browse sessions", expired);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self
            .sessions
            .iter()
            .min_by_key(|(_, s)| s.last_active)
            .map(|(k, _)| *k)
        {
            self.sessions.remove(&oldest);
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_SESSION_TTL_MINUTES))
    }
}
