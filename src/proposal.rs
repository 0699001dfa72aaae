use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of shade being proposed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadeType {
    #[default]
    Tree,
    Structure,
    Canopy,
    Other,
}

impl ShadeType {
    pub const ALL: [ShadeType; 4] = [
        ShadeType::Tree,
        ShadeType::Structure,
        ShadeType::Canopy,
        ShadeType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShadeType::Tree => "tree",
            ShadeType::Structure => "structure",
            ShadeType::Canopy => "canopy",
            ShadeType::Other => "other",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&t| t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ShadeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-submitted candidate shade location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ShadeType,
    pub desc: String,
    pub lat: f64,
    pub lng: f64,
    pub created: DateTime<Utc>,
}

/// Issues time-based proposal ids (`p_<unix millis>`) that never repeat,
/// even when two proposals land in the same millisecond.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_millis: i64,
}

impl IdGenerator {
    /// Seed from ids already in use so none of them is issued again
    pub fn seeded<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let last_millis = existing
            .into_iter()
            .filter_map(|id| id.strip_prefix("p_")?.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self { last_millis }
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis().max(self.last_millis.saturating_add(1));
        self.last_millis = millis;
        format!("p_{millis}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_type_serializes_lowercase() {
        let json = serde_json::to_string(&ShadeType::Canopy).unwrap();
        assert_eq!(json, "\"canopy\"");
    }

    #[test]
    fn test_type_cycles() {
        assert_eq!(ShadeType::Other.next(), ShadeType::Tree);
        assert_eq!(ShadeType::Tree.prev(), ShadeType::Other);
    }

    #[test]
    fn test_ids_are_time_based_and_unique() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut ids = IdGenerator::default();
        assert_eq!(ids.next_id(now), "p_1700000000000");
        assert_eq!(ids.next_id(now), "p_1700000000001");
    }

    #[test]
    fn test_seeded_skips_existing() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let mut ids = IdGenerator::seeded(["p_5000", "p_4000", "legacy"]);
        assert_eq!(ids.next_id(now), "p_5001");
    }

    #[test]
    fn test_seed_at_i64_max_does_not_overflow() {
        let mut ids = IdGenerator::seeded(["p_9223372036854775807"]);
        assert_eq!(ids.next_id(Utc::now()), "p_9223372036854775807");
    }

    #[test]
    fn test_stored_field_names() {
        let p = Proposal {
            id: "p_1".into(),
            name: "Shade Oak".into(),
            kind: ShadeType::Tree,
            desc: "test".into(),
            lat: 32.23,
            lng: -110.95,
            created: Utc.timestamp_millis_opt(1).unwrap(),
        };
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["type"], "tree");
        assert_eq!(value["desc"], "test");
        assert_eq!(value["lng"], -110.95);
    }
}
