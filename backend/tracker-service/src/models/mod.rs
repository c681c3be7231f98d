use serde::Serialize;
use std::fmt;

/// Store command carried by an increment operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Command {
    HashIncrementBy,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::HashIncrementBy => "HINCRBY",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single counter increment flowing through the batching pipeline.
///
/// Built while handling a request and consumed once by the persistence
/// executor as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncrementOperation {
    pub command: Command,
    pub key: String,
    pub field: String,
    pub amount: i64,
}

impl IncrementOperation {
    /// `HINCRBY key field 1`
    pub fn hincrby(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            command: Command::HashIncrementBy,
            key: key.into(),
            field: field.into(),
            amount: 1,
        }
    }
}

/// Decoded `/track` query parameters. Missing parameters are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackParams {
    pub campaign: String,
    pub source: String,
    pub status: String,
    pub platform: String,
    /// Website id, carried in the `w` parameter
    pub website: String,
    pub tag: String,
}

impl TrackParams {
    /// Parse a raw (undecoded) query string. The first occurrence of a
    /// repeated parameter wins.
    pub fn from_query(query: &str) -> Self {
        let mut params = TrackParams::default();
        let mut seen = [false; 6];

        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let (slot, target) = match &*name {
                "campaign" => (0, &mut params.campaign),
                "source" => (1, &mut params.source),
                "status" => (2, &mut params.status),
                "platform" => (3, &mut params.platform),
                "w" => (4, &mut params.website),
                "tag" => (5, &mut params.tag),
                _ => continue,
            };
            if !seen[slot] {
                seen[slot] = true;
                *target = value.into_owned();
            }
        }

        params
    }
}
