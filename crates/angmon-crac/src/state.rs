use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Optimization instant. The derived order is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instant {
    Preventive,
    Outage,
    Auto,
    Curative,
}

impl Instant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Instant::Preventive => "preventive",
            Instant::Outage => "outage",
            Instant::Auto => "auto",
            Instant::Curative => "curative",
        }
    }

    pub fn is_preventive(&self) -> bool {
        matches!(self, Instant::Preventive)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The preventive situation, or one contingency seen at one post-outage instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub contingency: Option<String>,
    pub instant: Instant,
}

impl State {
    pub fn preventive() -> Self {
        Self {
            contingency: None,
            instant: Instant::Preventive,
        }
    }

    pub fn post_contingency(contingency: impl Into<String>, instant: Instant) -> Self {
        Self {
            contingency: Some(contingency.into()),
            instant,
        }
    }

    pub fn is_preventive(&self) -> bool {
        self.contingency.is_none()
    }

    /// `preventive`, or `<contingency> - <instant>`.
    pub fn id(&self) -> String {
        match &self.contingency {
            None => self.instant.to_string(),
            Some(contingency) => format!("{} - {}", contingency, self.instant),
        }
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.contingency.cmp(&other.contingency))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}
