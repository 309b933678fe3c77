use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{LICENSING_SERVICE, REGISTRATION_SERVICE, TOWN_ATTRIBUTE};

/// One of the two transaction types the feed reports wait times for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    Licensing,
    Registration,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::Licensing, Service::Registration];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Licensing => LICENSING_SERVICE,
            Service::Registration => REGISTRATION_SERVICE,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            LICENSING_SERVICE => Some(Service::Licensing),
            REGISTRATION_SERVICE => Some(Service::Registration),
            _ => None,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single branch attribute from the feed
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Raw(String),
    Minutes(f64),
}

impl AttributeValue {
    pub fn as_minutes(&self) -> Option<f64> {
        match self {
            AttributeValue::Minutes(m) => Some(*m),
            AttributeValue::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            AttributeValue::Raw(s) => Some(s),
            AttributeValue::Minutes(_) => None,
        }
    }
}

/// All attributes reported for one branch, keyed by attribute name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchRecord {
    attributes: BTreeMap<String, AttributeValue>,
}

impl BranchRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn town(&self) -> Option<&str> {
        self.get(TOWN_ATTRIBUTE).and_then(AttributeValue::as_raw)
    }

    /// Wait time in minutes for `service`, if the branch reported one
    pub fn minutes(&self, service: Service) -> Option<f64> {
        self.get(service.as_str()).and_then(AttributeValue::as_minutes)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Wait times for every branch in one feed fetch, keyed by town
pub type WaitTimeSnapshot = BTreeMap<String, BranchRecord>;

/// A single observation sent to the monitoring backend
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub branch: String,
    pub service: Service,
    pub timestamp: String,
    pub value: f64,
}

/// Label schema entry of a metric descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDescriptor {
    pub key: String,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Metric descriptor resource as exchanged with the Cloud Monitoring API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: String,
    #[serde(default)]
    pub labels: Vec<LabelDescriptor>,
    #[serde(default)]
    pub metric_kind: Option<String>,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// RFC3339 timestamp in UTC with whole-second precision, e.g. `2024-03-01T12:00:00Z`
pub fn to_rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now_rfc3339() -> String {
    to_rfc3339(Utc::now())
}
