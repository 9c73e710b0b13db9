use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_LEN: usize = 32;

/// Unguessable per-order token that lets a guest look up their order
/// without an account. Always 32 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingToken(String);

impl TrackingToken {
    /// Fresh random token (122 random bits from a v4 UUID).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn parse(s: &str) -> Result<Self, TrackingTokenError> {
        let s = s.trim();
        if s.len() != TOKEN_LEN {
            return Err(TrackingTokenError::BadLength(s.len()));
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(TrackingTokenError::NotLowerHex);
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a presented token.
    pub fn matches(&self, presented: &str) -> bool {
        let a = self.0.as_bytes();
        let b = presented.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl std::fmt::Debug for TrackingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens grant read access to an order; keep them out of logs.
        f.write_str("TrackingToken(<REDACTED>)")
    }
}

impl TryFrom<String> for TrackingToken {
    type Error = TrackingTokenError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TrackingToken> for String {
    fn from(t: TrackingToken) -> Self {
        t.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackingTokenError {
    BadLength(usize),
    NotLowerHex,
}

impl std::fmt::Display for TrackingTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingTokenError::BadLength(n) => {
                write!(f, "tracking token must be {TOKEN_LEN} chars, got {n}")
            }
            TrackingTokenError::NotLowerHex => write!(f, "tracking token must be lowercase hex"),
        }
    }
}

impl std::error::Error for TrackingTokenError {}
