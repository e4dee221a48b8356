//! Live status values and history series

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Latest known value for an entity.
///
/// Owned by whichever fetch adapter last fetched it; never cached globally,
/// so two widgets watching the same entity hold independent copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStatus {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EntityStatus {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Numeric view of the value: a JSON number, or a string that parses as
    /// one. Anything else is non-numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

/// One aggregated point of an entity's history series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Time window for history queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "range", rename_all = "snake_case")]
pub enum TimeRange {
    #[default]
    LastHour,
    LastDay,
    LastWeek,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeRange {
    /// Concrete [start, end) bounds relative to `now`
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            TimeRange::LastHour => (now - Duration::hours(1), now),
            TimeRange::LastDay => (now - Duration::days(1), now),
            TimeRange::LastWeek => (now - Duration::weeks(1), now),
            TimeRange::Custom { start, end } => (*start, *end),
        }
    }
}

/// Aggregation applied to raw history samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    #[default]
    Avg,
    Min,
    Max,
    Sum,
    Count,
}

impl Aggregate {
    /// Wire name used in history query parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Avg => "avg",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Sum => "sum",
            Aggregate::Count => "count",
        }
    }
}
