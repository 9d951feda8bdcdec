//! Provisioning activity events
//!
//! Events are created by provisioning actions, appended to the activity log
//! and never mutated afterwards. [`NewActivity`] is the partially filled form
//! callers hand to the log; the log completes it with an id and timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Activity event identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Generate a new, time-sortable identifier
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What happened
///
/// Known provisioning kinds get their own variant; anything else is kept
/// verbatim so the dashboard can still show it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    /// `provision:create`
    Create,
    /// `provision:destroy`
    Destroy,
    /// `provision:teardown`
    Teardown,
    /// Any other kind string
    Other(String),
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "provision:create",
            Self::Destroy => "provision:destroy",
            Self::Teardown => "provision:teardown",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActivityKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "provision:create" => Self::Create,
            "provision:destroy" => Self::Destroy,
            "provision:teardown" => Self::Teardown,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for ActivityKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ActivityKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Network placement of a provisioned instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
}

/// A completed activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: EventId,
    pub ts: DateTime<Utc>,
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkRef>,
    /// Free-form payload (structured or plain text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A partially filled event, as supplied by callers of the log
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub id: Option<EventId>,
    pub ts: Option<DateTime<Utc>>,
    pub kind: ActivityKind,
    pub region: Option<String>,
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub network: Option<NetworkRef>,
    pub details: Option<serde_json::Value>,
}

impl NewActivity {
    /// Start an event of the given kind
    #[must_use]
    pub fn new(kind: impl Into<ActivityKind>) -> Self {
        Self {
            id: None,
            ts: None,
            kind: kind.into(),
            region: None,
            instance_id: None,
            instance_type: None,
            network: None,
            details: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = Some(ts);
        self
    }

    #[inline]
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn network(mut self, network: NetworkRef) -> Self {
        self.network = Some(network);
        self
    }

    #[inline]
    #[must_use]
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Fill in the missing id and timestamp
    #[must_use]
    pub fn complete(self, now: DateTime<Utc>) -> ActivityEvent {
        ActivityEvent {
            id: self.id.unwrap_or_else(EventId::generate),
            ts: self.ts.unwrap_or(now),
            kind: self.kind,
            region: self.region,
            instance_id: self.instance_id,
            instance_type: self.instance_type,
            network: self.network,
            details: self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(ActivityKind::from("provision:create"), ActivityKind::Create);
        assert_eq!(String::from(ActivityKind::Teardown), "provision:teardown");
        assert_eq!(
            ActivityKind::from("dashboard:refresh"),
            ActivityKind::Other("dashboard:refresh".to_string())
        );

        let json = serde_json::to_string(&ActivityKind::Create).unwrap();
        assert_eq!(json, "\"provision:create\"");
    }

    #[test]
    fn unprefixed_kind_is_kept_verbatim() {
        let kind = ActivityKind::from("destroy");
        assert_eq!(kind, ActivityKind::Other("destroy".to_string()));
        assert_eq!(String::from(kind), "destroy");
    }

    #[test]
    fn complete_fills_missing_fields() {
        let now = Utc::now();
        let event = NewActivity::new(ActivityKind::Create)
            .region("us-east-1")
            .complete(now);

        assert_eq!(event.ts, now);
        assert!(!event.id.as_str().is_empty());
        assert_eq!(event.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn complete_keeps_supplied_fields() {
        let ts = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = NewActivity::new("provision:destroy")
            .with_id("evt-1")
            .at(ts)
            .complete(Utc::now());

        assert_eq!(event.id.as_str(), "evt-1");
        assert_eq!(event.ts, ts);
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let event = NewActivity::new(ActivityKind::Create)
            .with_id("evt-2")
            .complete(Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("region").is_none());
        assert!(json.get("network").is_none());
        assert_eq!(json["kind"], "provision:create");
    }
}
