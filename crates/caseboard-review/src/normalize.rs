//! Case normalization: the structure boards and validators consume.

use crate::error::{ReviewError, ReviewResult};
use crate::evidence::modality_for_key;
use caseboard_types::{Case, Modality, NormalizedCase, Observation, SourceRef};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Build a [`NormalizedCase`] from a raw submission.
pub fn normalize(case: &Case) -> ReviewResult<NormalizedCase> {
    let top = case
        .as_object()
        .ok_or_else(|| ReviewError::InvalidCase("case must be a JSON object".into()))?;

    let clinical_notes = case
        .text_field("clinical_notes")
        .or_else(|| case.text_field("notes"))
        .map(String::from);

    let mut observations = Vec::new();

    if let Some(notes) = &clinical_notes {
        let mut content = Map::new();
        content.insert("notes".into(), Value::String(notes.clone()));
        observations.push(Observation::new("clinical-0", Modality::Clinical, content));
    }

    // Block keys resolve through the same keyword table as evidence
    // detection, at the top level and one level down. Clinical blocks are
    // carried by the notes alone.
    let mut counters: BTreeMap<Modality, usize> = BTreeMap::new();
    for (key, value) in top {
        match modality_for_key(key) {
            Some(Modality::Clinical) => {}
            Some(modality) => push_block(&mut observations, &mut counters, modality, key, value),
            None => {
                let Some(nested) = value.as_object() else {
                    continue;
                };
                for (inner_key, inner) in nested {
                    match modality_for_key(inner_key) {
                        None | Some(Modality::Clinical) => {}
                        Some(modality) => {
                            push_block(&mut observations, &mut counters, modality, inner_key, inner)
                        }
                    }
                }
            }
        }
    }

    if let Some(rows) = top.get("observations").and_then(Value::as_array) {
        for row in rows {
            match serde_json::from_value::<Observation>(row.clone()) {
                Ok(obs) => observations.push(obs),
                Err(e) => debug!(error = %e, "Skipping malformed observation row"),
            }
        }
    }

    let mut modalities: Vec<Modality> = observations.iter().map(|o| o.modality).collect();
    modalities.sort();
    modalities.dedup();

    let sources = top
        .get("sources")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| serde_json::from_value::<SourceRef>(row.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(NormalizedCase {
        case_id: case.case_id().map(String::from),
        subject_id: case.text_field("subject_id").map(String::from),
        clinical_notes,
        demographics: top.get("demographics").and_then(Value::as_object).cloned(),
        modalities,
        observations,
        sources,
        raw: case.clone(),
    })
}

fn push_block(
    observations: &mut Vec<Observation>,
    counters: &mut BTreeMap<Modality, usize>,
    modality: Modality,
    key: &str,
    value: &Value,
) {
    let mut next_id = |modality: Modality| {
        let n = counters.entry(modality).or_default();
        let id = format!("{}-{n}", modality.as_str());
        *n += 1;
        id
    };

    match value {
        Value::Null => {}
        Value::Object(block) if block.is_empty() => {}
        // Imaging blocks split into one observation per study.
        Value::Object(block) if modality == Modality::Imaging => {
            for (study, content) in block {
                let mut single = Map::new();
                single.insert(study.clone(), content.clone());
                observations.push(Observation::new(format!("imaging-{study}"), modality, single));
            }
        }
        Value::Object(block) => {
            observations.push(Observation::new(next_id(modality), modality, block.clone()))
        }
        other => {
            let mut content = Map::new();
            content.insert(key.to_string(), other.clone());
            observations.push(Observation::new(next_id(modality), modality, content));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_observations_per_block() {
        let case = Case::new(json!({
            "case_id": "c-1",
            "subject_id": "s-1",
            "notes": "forgetful",
            "imaging": {"mri": "t1", "pet": "amyloid"},
            "omics": {"apoe": "e3/e4"},
            "pharma": {},
            "sources": [
                {"uri": "s3://bucket/a", "modality": "imaging", "checksum": "abc"},
                {"uri": "missing modality"}
            ],
        }));
        let n = normalize(&case).unwrap();

        assert_eq!(n.case_id.as_deref(), Some("c-1"));
        assert_eq!(n.clinical_notes.as_deref(), Some("forgetful"));
        assert_eq!(n.observations.len(), 4);
        assert_eq!(
            n.modalities,
            vec![Modality::Clinical, Modality::Imaging, Modality::Genomics]
        );
        assert_eq!(n.sources.len(), 1);
        assert_eq!(n.observations_for(Modality::Imaging).count(), 2);
    }

    #[test]
    fn keeps_parseable_observation_rows() {
        let case = Case::new(json!({
            "observations": [
                {"id": "o1", "modality": "env", "content": {"sleep_hours": 5}},
                {"id": "o2", "modality": "unknown", "content": {}},
                "not an object"
            ]
        }));
        let n = normalize(&case).unwrap();
        assert_eq!(n.observations.len(), 1);
        assert_eq!(n.modalities, vec![Modality::Environment]);
    }

    #[test]
    fn block_aliases_follow_evidence_keywords() {
        let raw = json!({
            "ENV": {"sleep_hours": 5},
            "meds": ["donepezil"],
            "history": {"lifestyle": {"exercise": "low"}, "rx": "memantine"},
            "payload": {"MRI": "t1 weighted"}
        });
        let n = normalize(&Case::new(raw.clone())).unwrap();

        assert_eq!(n.observations_for(Modality::Environment).count(), 2);
        assert_eq!(n.observations_for(Modality::Pharma).count(), 2);
        assert_eq!(n.observations_for(Modality::Imaging).count(), 1);
        let meds = n
            .observations_for(Modality::Pharma)
            .find(|o| o.content.contains_key("meds"))
            .unwrap();
        assert_eq!(meds.content["meds"], json!(["donepezil"]));

        // Every non-clinical modality the evidence map reports has observations.
        let evidence = crate::evidence::detect_evidence(&raw);
        for modality in Modality::ALL {
            if modality != Modality::Clinical && evidence.has(modality) {
                assert!(n.modalities.contains(&modality), "{modality} missing");
            }
        }
    }

    #[test]
    fn empty_case_has_no_modalities() {
        let n = normalize(&Case::empty()).unwrap();
        assert!(n.modalities.is_empty());
        assert!(n.case_id.is_none());
    }

    #[test]
    fn non_object_case_is_rejected() {
        let err = normalize(&Case::new(json!([1, 2, 3]))).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidCase(_)));
    }
}
