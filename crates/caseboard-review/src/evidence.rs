//! Evidence detection: which modalities a raw case carries.

use caseboard_types::{EvidenceMap, Modality};
use serde_json::{Map, Value};

/// Keys that indicate each modality, matched case-insensitively.
pub const MODALITY_KEYWORDS: [(Modality, &[&str]); 5] = [
    (
        Modality::Clinical,
        &["clinical", "clinical_notes", "notes", "symptoms", "mmse", "moca", "cdr"],
    ),
    (Modality::Imaging, &["imaging", "mri", "pet", "ct", "fmri", "dti"]),
    (
        Modality::Genomics,
        &["genomics", "omics", "genotype", "snps", "wgs", "rna_seq"],
    ),
    (Modality::Pharma, &["pharma", "meds", "medications", "drugs", "rx"]),
    (
        Modality::Environment,
        &["env", "environment", "exposure", "lifestyle", "sleep", "activity", "diet"],
    ),
];

/// Build the evidence map for a raw case.
///
/// A modality reads `true` when one of its keywords is a key of the case
/// object or of any object directly nested in it. Non-object cases carry
/// no evidence.
pub fn detect_evidence(raw: &Value) -> EvidenceMap {
    let mut evidence = EvidenceMap::new();
    let Some(top) = raw.as_object() else {
        return evidence;
    };

    let keys = collect_keys(top);
    for (modality, keywords) in MODALITY_KEYWORDS.iter() {
        let present = keywords.iter().any(|k| keys.iter().any(|key| key == k));
        evidence.set(*modality, present);
    }
    evidence
}

/// The modality a single key names, if any.
pub fn modality_for_key(key: &str) -> Option<Modality> {
    let key = key.to_ascii_lowercase();
    MODALITY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.contains(&key.as_str()))
        .map(|(modality, _)| *modality)
}

/// Lowercased keys at the top level and one level down.
fn collect_keys(top: &Map<String, Value>) -> Vec<String> {
    let mut keys: Vec<String> = top.keys().map(|k| k.to_ascii_lowercase()).collect();
    for nested in top.values().filter_map(Value::as_object) {
        keys.extend(nested.keys().map(|k| k.to_ascii_lowercase()));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_top_level_and_nested_keys() {
        let evidence = detect_evidence(&json!({
            "clinical_notes": "memory decline",
            "payload": {"MRI": "t1 weighted"},
        }));
        assert!(evidence.has(Modality::Clinical));
        assert!(evidence.has(Modality::Imaging));
        assert!(!evidence.has(Modality::Genomics));
    }

    #[test]
    fn ignores_keys_nested_two_levels_deep() {
        let evidence = detect_evidence(&json!({"a": {"b": {"snps": []}}}));
        assert!(!evidence.any());
    }

    #[test]
    fn values_do_not_count_as_keys() {
        let evidence = detect_evidence(&json!({"comment": "imaging pending"}));
        assert!(!evidence.has(Modality::Imaging));
    }

    #[test]
    fn non_object_case_has_no_evidence() {
        assert!(!detect_evidence(&json!("mri")).any());
        assert!(!detect_evidence(&json!(null)).any());
    }

    #[test]
    fn detection_is_deterministic() {
        let case = json!({"sleep": 6, "rx": ["donepezil"], "omics": {}});
        assert_eq!(detect_evidence(&case), detect_evidence(&case));
        let evidence = detect_evidence(&case);
        assert!(evidence.has(Modality::Environment));
        assert!(evidence.has(Modality::Pharma));
        assert!(evidence.has(Modality::Genomics));
    }
}
