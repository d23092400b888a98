use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The platform's type tag for an identifiable thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThingKind {
    Comment,
    Post,
    Subreddit,
}

impl ThingKind {
    /// Numeric type tag, as stored in the audit tables.
    pub fn code(self) -> i32 {
        match self {
            Self::Comment => 1,
            Self::Post => 3,
            Self::Subreddit => 5,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Comment => "t1",
            Self::Post => "t3",
            Self::Subreddit => "t5",
        }
    }

    /// Human word for user-facing messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Post => "post",
            Self::Subreddit => "subreddit",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "t1" => Some(Self::Comment),
            "t3" => Some(Self::Post),
            "t5" => Some(Self::Subreddit),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid thing id: {0:?}")]
pub struct InvalidThingId(pub String);

/// A parsed fullname: type tag plus the base-36 numeric part.
///
/// `"t3_5kgajm"` parses to `Post` plus the base-10 value of `5kgajm`; the
/// two halves are what the `actions` table stores as `target_type` /
/// `target_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThingId {
    pub kind: ThingKind,
    pub id: i64,
}

impl ThingId {
    pub fn new(kind: ThingKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// The numeric part re-encoded in base 36, lowercase.
    pub fn base36(&self) -> String {
        encode_base36(self.id)
    }

    pub fn fullname(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.base36())
    }
}

impl FromStr for ThingId {
    type Err = InvalidThingId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, rest) = s
            .split_once('_')
            .ok_or_else(|| InvalidThingId(s.to_string()))?;
        let kind =
            ThingKind::from_prefix(prefix).ok_or_else(|| InvalidThingId(s.to_string()))?;
        let id =
            i64::from_str_radix(rest, 36).map_err(|_| InvalidThingId(s.to_string()))?;
        Ok(Self { kind, id })
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

impl Serialize for ThingId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.fullname())
    }
}

impl<'de> Deserialize<'de> for ThingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

fn encode_base36(mut n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}
