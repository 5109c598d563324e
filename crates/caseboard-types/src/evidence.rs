//! Modalities and the evidence map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A category of clinical evidence.
///
/// Declaration order is the iteration order used by board selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Clinical,
    Imaging,
    #[serde(alias = "omics")]
    Genomics,
    Pharma,
    #[serde(alias = "env")]
    Environment,
}

impl Modality {
    /// Every modality, in iteration order.
    pub const ALL: [Modality; 5] = [
        Modality::Clinical,
        Modality::Imaging,
        Modality::Genomics,
        Modality::Pharma,
        Modality::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Clinical => "clinical",
            Modality::Imaging => "imaging",
            Modality::Genomics => "genomics",
            Modality::Pharma => "pharma",
            Modality::Environment => "environment",
        }
    }

    /// Parse a modality name, accepting the `omics` and `env` aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "clinical" => Some(Modality::Clinical),
            "imaging" => Some(Modality::Imaging),
            "genomics" | "omics" => Some(Modality::Genomics),
            "pharma" => Some(Modality::Pharma),
            "environment" | "env" => Some(Modality::Environment),
            _ => None,
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which modalities were found in a case.
///
/// Always holds an entry for every [`Modality`]; absent evidence reads `false`.
/// Backed by an ordered map so equality and serialization do not depend on
/// detection order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceMap {
    entries: BTreeMap<Modality, bool>,
}

impl EvidenceMap {
    /// An evidence map with every modality set to `false`.
    pub fn new() -> Self {
        Self {
            entries: Modality::ALL.iter().map(|m| (*m, false)).collect(),
        }
    }

    pub fn set(&mut self, modality: Modality, present: bool) {
        self.entries.insert(modality, present);
    }

    pub fn with(mut self, modality: Modality, present: bool) -> Self {
        self.set(modality, present);
        self
    }

    pub fn has(&self, modality: Modality) -> bool {
        self.entries.get(&modality).copied().unwrap_or(false)
    }

    /// Whether any modality has evidence.
    pub fn any(&self) -> bool {
        self.entries.values().any(|v| *v)
    }

    /// Modalities with evidence, in iteration order.
    pub fn present(&self) -> impl Iterator<Item = Modality> + '_ {
        self.entries
            .iter()
            .filter(|(_, present)| **present)
            .map(|(m, _)| *m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Modality, bool)> + '_ {
        self.entries.iter().map(|(m, v)| (*m, *v))
    }
}

impl Default for EvidenceMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_has_every_modality_false() {
        let map = EvidenceMap::new();
        assert_eq!(map.iter().count(), 5);
        assert!(!map.any());
        assert!(Modality::ALL.iter().all(|m| !map.has(*m)));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = EvidenceMap::new()
            .with(Modality::Pharma, true)
            .with(Modality::Imaging, true);
        let b = EvidenceMap::new()
            .with(Modality::Imaging, true)
            .with(Modality::Pharma, true);
        assert_eq!(a, b);
        assert_eq!(
            a.present().collect::<Vec<_>>(),
            vec![Modality::Imaging, Modality::Pharma]
        );
    }

    #[test]
    fn serializes_as_lowercase_object() {
        let map = EvidenceMap::new().with(Modality::Environment, true);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["environment"], serde_json::json!(true));
        assert_eq!(json["clinical"], serde_json::json!(false));
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(Modality::parse("omics"), Some(Modality::Genomics));
        assert_eq!(Modality::parse("ENV"), Some(Modality::Environment));
        assert_eq!(Modality::parse("demographics"), None);
    }
}
