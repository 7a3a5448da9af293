//! Symptom vocabulary: display labels, categories and search suggestions

use serde::{Deserialize, Serialize};

/// Fixed grouping used by the symptom picker
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum SymptomCategory {
    General,
    Respiratory,
    Neurological,
    Gastrointestinal,
    Muscular,
    Skin,
    Other,
}

impl SymptomCategory {
    pub const ALL: [SymptomCategory; 7] = [
        SymptomCategory::General,
        SymptomCategory::Respiratory,
        SymptomCategory::Neurological,
        SymptomCategory::Gastrointestinal,
        SymptomCategory::Muscular,
        SymptomCategory::Skin,
        SymptomCategory::Other,
    ];

    /// Vocabulary keys that belong to this category. `Other` is whatever is left.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            SymptomCategory::General => &["fever", "fatigue", "headache", "nausea", "vomiting", "sweating"],
            SymptomCategory::Respiratory => &[
                "cough",
                "shortness_of_breath",
                "difficulty_breathing",
                "chest_pain",
                "rapid_breathing",
            ],
            SymptomCategory::Neurological => &["confusion", "seizures", "dizziness", "loss_of_consciousness"],
            SymptomCategory::Gastrointestinal => &["abdominal_pain", "diarrhea", "loss_of_appetite"],
            SymptomCategory::Muscular => &["muscle_aches", "joint_pain", "weakness"],
            SymptomCategory::Skin => &["rash", "pale_skin", "blue_lips_or_fingernails"],
            SymptomCategory::Other => &[],
        }
    }

    /// Category a vocabulary key falls into
    pub fn of(symptom: &str) -> SymptomCategory {
        Self::ALL
            .into_iter()
            .find(|category| category.keys().contains(&symptom))
            .unwrap_or(SymptomCategory::Other)
    }
}

/// `"shortness_of_breath"` -> `"Shortness Of Breath"`
pub fn format_symptom_label(symptom: &str) -> String {
    symptom
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// One pickable symptom
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomOption {
    pub value: String,
    pub label: String,
    pub category: SymptomCategory,
}

impl SymptomOption {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            label: format_symptom_label(value),
            category: SymptomCategory::of(value),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: SymptomCategory,
    pub symptoms: Vec<SymptomOption>,
}

/// Partition `vocabulary` into every category, in display order.
///
/// Named categories list only the keys the vocabulary actually contains, in
/// table order; `Other` keeps vocabulary order.
pub fn categorize(vocabulary: &[String]) -> Vec<CategoryGroup> {
    SymptomCategory::ALL
        .into_iter()
        .map(|category| {
            let symptoms = match category {
                SymptomCategory::Other => vocabulary
                    .iter()
                    .filter(|symptom| SymptomCategory::of(symptom) == SymptomCategory::Other)
                    .map(|symptom| SymptomOption::new(symptom))
                    .collect(),
                named => named
                    .keys()
                    .iter()
                    .filter(|key| vocabulary.iter().any(|symptom| symptom == *key))
                    .map(|key| SymptomOption::new(key))
                    .collect(),
            };
            CategoryGroup { category, symptoms }
        })
        .collect()
}

/// Upper bound on suggestions returned for one query
pub const MAX_SUGGESTIONS: usize = 10;

/// Well-known symptom bundles offered when the query names one
pub fn common_combination(query: &str) -> Option<&'static [&'static str]> {
    match query {
        "cold" => Some(&["runny_nose", "sneezing", "sore_throat", "cough"]),
        "flu" => Some(&["fever", "body_aches", "fatigue", "headache"]),
        "stomach" => Some(&["nausea", "vomiting", "abdominal_pain", "diarrhea"]),
        _ => None,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "match", rename_all = "lowercase")]
pub enum SuggestionKind {
    Symptom,
    Combination { symptoms: Vec<String> },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomSuggestion {
    pub value: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: SuggestionKind,
}

/// Vocabulary entries whose key or label contains `query`, then a matching
/// combination, capped at [`MAX_SUGGESTIONS`]
pub fn symptom_suggestions(vocabulary: &[String], query: &str) -> Vec<SymptomSuggestion> {
    let query = query.trim().to_lowercase();
    let mut suggestions: Vec<SymptomSuggestion> = vocabulary
        .iter()
        .filter_map(|symptom| {
            let label = format_symptom_label(symptom);
            let hit = symptom.to_lowercase().contains(&query) || label.to_lowercase().contains(&query);
            hit.then(|| SymptomSuggestion {
                value: symptom.clone(),
                label,
                kind: SuggestionKind::Symptom,
            })
        })
        .collect();

    if let Some(bundle) = common_combination(&query) {
        suggestions.push(SymptomSuggestion {
            value: query.clone(),
            label: format!("{} symptoms", query),
            kind: SuggestionKind::Combination {
                symptoms: bundle.iter().map(|s| s.to_string()).collect(),
            },
        });
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}
