//! Raw and normalized case records.

use crate::evidence::Modality;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw case submission, stored verbatim.
///
/// Any JSON value is accepted here; ingestion guarantees that real
/// submissions are objects with at least one signal-bearing field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Case {
    raw: Value,
}

impl Case {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// An empty object case.
    pub fn empty() -> Self {
        Self {
            raw: Value::Object(Map::new()),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.raw.as_object()
    }

    /// Top-level string field, trimmed, if present and non-blank.
    pub fn text_field(&self, key: &str) -> Option<&str> {
        self.raw
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Explicit case identifier, if the submission carried one.
    pub fn case_id(&self) -> Option<&str> {
        self.text_field("case_id")
    }
}

impl From<Value> for Case {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

/// Reference to an upstream source document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub modality: Modality,
}

/// One modality-tagged observation extracted from a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub modality: Modality,
    pub content: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Observation {
    pub fn new(id: impl Into<String>, modality: Modality, content: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            modality,
            content,
            confidence: None,
        }
    }

    /// String values of this observation's content.
    pub fn text_values(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.content
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }
}

/// The structure boards and validators consume, built once per case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCase {
    pub case_id: Option<String>,
    pub subject_id: Option<String>,
    pub clinical_notes: Option<String>,
    pub demographics: Option<Map<String, Value>>,
    /// Sorted, de-duplicated modalities of the observations.
    pub modalities: Vec<Modality>,
    pub observations: Vec<Observation>,
    pub sources: Vec<SourceRef>,
    /// The verbatim submission.
    pub raw: Case,
}

impl NormalizedCase {
    /// Observations of a single modality.
    pub fn observations_for(&self, modality: Modality) -> impl Iterator<Item = &Observation> + '_ {
        self.observations
            .iter()
            .filter(move |o| o.modality == modality)
    }

    /// Integer-like `demographics.age`, if present.
    pub fn age(&self) -> Option<i64> {
        let age = self.demographics.as_ref()?.get("age")?;
        match age {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => {
                let digits: String = s
                    .trim()
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit() && *c != '-' && *c != '+')
                    .take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
                    .collect();
                digits.parse().ok()
            }
            _ => None,
        }
    }
}
