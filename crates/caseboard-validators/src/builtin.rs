//! Built-in validators.

use crate::error::ValidatorResult;
use crate::validator::{ValidationFinding, Validator};
use caseboard_types::{FindingSeverity, NormalizedCase};
use regex::Regex;

// ── Schema ───────────────────────────────────────────────────────────

/// Identifiers present and modalities declared.
#[derive(Debug, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub const CODE: &'static str = "SCHEMA_VALID";
}

impl Validator for SchemaValidator {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "Case identifiers present and modalities declared"
    }

    fn run(&self, case: &NormalizedCase) -> ValidatorResult<Vec<ValidationFinding>> {
        let mut findings = Vec::new();
        if case.case_id.is_none() || case.subject_id.is_none() {
            let path = if case.case_id.is_none() { "case_id" } else { "subject_id" };
            findings.push(
                ValidationFinding::new(
                    Self::CODE,
                    FindingSeverity::Block,
                    "Missing case_id or subject_id",
                )
                .at(path),
            );
        }
        if case.modalities.is_empty() {
            findings.push(ValidationFinding::new(
                Self::CODE,
                FindingSeverity::Warn,
                "No modalities specified",
            ));
        }
        Ok(findings)
    }
}

// ── PHI scan ─────────────────────────────────────────────────────────

const PHI_PATTERNS: [(&str, &str); 3] = [
    (r"\b\d{3}-\d{2}-\d{4}\b", "US SSN-like"),
    (r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}", "Email"),
    (r"\b\+?1?\s*\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b", "Phone"),
];

/// Scans observation text and clinical notes for identifier-like strings.
#[derive(Debug)]
pub struct PhiValidator {
    patterns: Vec<(Regex, &'static str)>,
}

impl PhiValidator {
    pub const CODE: &'static str = "PHI_SCAN";

    pub fn new() -> ValidatorResult<Self> {
        let patterns = PHI_PATTERNS
            .iter()
            .map(|(pattern, label)| -> ValidatorResult<(Regex, &'static str)> {
                Ok((Regex::new(pattern)?, *label))
            })
            .collect::<ValidatorResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    fn labels_in<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.patterns
            .iter()
            .filter(move |(re, _)| re.is_match(text))
            .map(|(_, label)| *label)
    }
}

impl Validator for PhiValidator {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "PHI/PII scan of text observations"
    }

    fn run(&self, case: &NormalizedCase) -> ValidatorResult<Vec<ValidationFinding>> {
        let mut hits = Vec::new();
        for obs in &case.observations {
            for (field, text) in obs.text_values() {
                for label in self.labels_in(text) {
                    hits.push((format!("observations.{}.{}", obs.id, field), label));
                }
            }
        }
        // Notes normally arrive as a clinical observation already.
        if !case.observations.iter().any(|o| o.id == "clinical-0") {
            if let Some(notes) = &case.clinical_notes {
                for label in self.labels_in(notes) {
                    hits.push(("clinical_notes".to_string(), label));
                }
            }
        }

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let detail: Vec<String> = hits
            .iter()
            .map(|(path, label)| format!("{label} at {path}"))
            .collect();
        let finding = ValidationFinding::new(
            Self::CODE,
            FindingSeverity::Warn,
            format!("Potential PHI/PII: {} ({})", hits.len(), detail.join(", ")),
        )
        .at(hits[0].0.clone());
        Ok(vec![finding])
    }
}

// ── Audit completeness ───────────────────────────────────────────────

/// Sources carry checksums; modalities declared.
#[derive(Debug, Default)]
pub struct AuditCompletenessValidator;

impl AuditCompletenessValidator {
    pub const CODE: &'static str = "AUDIT_COMPLETE";
}

impl Validator for AuditCompletenessValidator {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "Sources have checksums; modalities declared"
    }

    fn run(&self, case: &NormalizedCase) -> ValidatorResult<Vec<ValidationFinding>> {
        let mut messages: Vec<String> = case
            .sources
            .iter()
            .filter(|s| s.checksum.as_deref().map_or(true, str::is_empty))
            .map(|s| format!("Source {} missing checksum", s.uri))
            .collect();
        if case.modalities.is_empty() {
            messages.push("No modalities set".to_string());
        }

        if messages.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![ValidationFinding::new(
                Self::CODE,
                FindingSeverity::Warn,
                messages.join("; "),
            )])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseboard_types::{Case, Modality, Observation, SourceRef};
    use serde_json::json;

    fn case() -> NormalizedCase {
        NormalizedCase {
            case_id: Some("c-1".into()),
            subject_id: Some("s-1".into()),
            clinical_notes: None,
            demographics: None,
            modalities: vec![Modality::Clinical],
            observations: vec![],
            sources: vec![],
            raw: Case::empty(),
        }
    }

    #[test]
    fn schema_blocks_on_missing_subject() {
        let mut c = case();
        c.subject_id = None;
        let findings = SchemaValidator.run(&c).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, FindingSeverity::Block);
        assert_eq!(findings[0].data_path.as_deref(), Some("subject_id"));
    }

    #[test]
    fn schema_warns_without_modalities() {
        let mut c = case();
        c.modalities.clear();
        let findings = SchemaValidator.run(&c).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, FindingSeverity::Warn);
    }

    #[test]
    fn phi_scan_flags_emails_and_ssns() {
        let mut c = case();
        let content = json!({"notes": "contact jane.doe@example.org, ssn 123-45-6789"});
        c.observations.push(Observation::new(
            "clinical-0",
            Modality::Clinical,
            content.as_object().cloned().unwrap(),
        ));
        let findings = PhiValidator::new().unwrap().run(&c).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("Email"));
        assert!(findings[0].message.contains("US SSN-like"));
    }

    #[test]
    fn phi_scan_passes_clean_text() {
        let mut c = case();
        c.clinical_notes = Some("memory decline and sleep fragmentation".into());
        assert!(PhiValidator::new().unwrap().run(&c).unwrap().is_empty());
    }

    #[test]
    fn audit_completeness_lists_unchecked_sources() {
        let mut c = case();
        c.sources = vec![
            SourceRef {
                uri: "s3://a".into(),
                checksum: Some("sha256:1".into()),
                modality: Modality::Imaging,
            },
            SourceRef {
                uri: "s3://b".into(),
                checksum: None,
                modality: Modality::Imaging,
            },
        ];
        let findings = AuditCompletenessValidator.run(&c).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("s3://b"));
        assert!(!findings[0].message.contains("s3://a"));
    }
}
