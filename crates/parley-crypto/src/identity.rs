//! Canonical session identity for an unordered pair of actors.

use std::fmt;

/// Separator between the two actor ids of a session id.
pub const SESSION_ID_SEPARATOR: char = ':';

/// Canonical identifier of a pairwise session.
///
/// The two actor ids sorted lexicographically and joined by
/// [`SESSION_ID_SEPARATOR`]. `SessionId::canonicalize(a, b)` and
/// `SessionId::canonicalize(b, a)` are always equal, so both participants and
/// the relay resolve a pair to the same record regardless of who initiated.
///
/// Actor ids containing the separator make the joined string ambiguous;
/// equality is defined on the sorted pair, not on the joined string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId {
    first: String,
    second: String,
}

impl SessionId {
    /// Canonicalize an unordered pair of actor ids.
    pub fn canonicalize(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self { first: first.to_string(), second: second.to_string() }
    }

    /// Lexicographically smaller actor id.
    pub fn first(&self) -> &str {
        &self.first
    }

    /// Lexicographically larger actor id.
    pub fn second(&self) -> &str {
        &self.second
    }

    /// Whether `actor_id` is one of the two participants.
    pub fn involves(&self, actor_id: &str) -> bool {
        self.first == actor_id || self.second == actor_id
    }

    /// The participant that is not `actor_id`. `None` if `actor_id` is not a
    /// participant.
    pub fn peer_of(&self, actor_id: &str) -> Option<&str> {
        if self.first == actor_id {
            Some(&self.second)
        } else if self.second == actor_id {
            Some(&self.first)
        } else {
            None
        }
    }

    /// The joined string form, `first:second`.
    pub fn as_key(&self) -> String {
        format!("{}{SESSION_ID_SEPARATOR}{}", self.first, self.second)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SESSION_ID_SEPARATOR}{}", self.first, self.second)
    }
}
