use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::RecordId;

/// How urgently a suspected condition should be treated
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyThreshold {
    #[display(fmt = "low")]
    Low,
    #[display(fmt = "medium")]
    Medium,
    #[display(fmt = "high")]
    High,
}

/// One row of the backend disease library (`diseases/`)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Disease {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub disease_type: Option<String>,
    /// `None` when the backend sends a value outside low/medium/high,
    /// including the bare integer thresholds older deployments store
    #[serde(default, deserialize_with = "known_threshold")]
    pub emergency_threshold: Option<EmergencyThreshold>,
    #[serde(default)]
    pub is_contagious: bool,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

fn known_threshold<'de, D>(deserializer: D) -> Result<Option<EmergencyThreshold>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| serde_json::from_value(value).ok()))
}

/// Disease metadata keyed by case-insensitive name
#[derive(Clone, Debug, Default)]
pub struct DiseaseCatalog {
    by_name: HashMap<String, Disease>,
}

impl DiseaseCatalog {
    pub fn new(diseases: impl IntoIterator<Item = Disease>) -> Self {
        Self {
            by_name: diseases
                .into_iter()
                .map(|disease| (disease.name.trim().to_lowercase(), disease))
                .collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Disease> {
        self.by_name.get(&name.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Disease> {
        self.by_name.values()
    }
}
