use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::FieldValue;
use crate::sim::framework::FieldId;

/// One recorded value and the step it was taken at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub step_index: usize,
    pub value: FieldValue,
}

#[derive(Debug, Serialize)]
struct FieldSequence<'a> {
    field: &'a FieldId,
    samples: &'a [Sample],
}

/// Append-only per-field sample sequences.
///
/// Fields are kept in the order they were first recorded.
#[derive(Debug, Default)]
pub struct SequenceRecorder {
    order: Vec<FieldId>,
    sequences: HashMap<FieldId, Vec<Sample>>,
}

impl SequenceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: &FieldId, step_index: usize, value: FieldValue) {
        let samples = match self.sequences.get_mut(field) {
            Some(s) => s,
            None => {
                self.order.push(field.clone());
                self.sequences.entry(field.clone()).or_default()
            }
        };
        samples.push(Sample { step_index, value });
    }

    /// Samples for `field` in recording order. Empty if never recorded.
    pub fn sequence_for(&self, field: &FieldId) -> &[Sample] {
        self.sequences.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total number of samples across all fields.
    pub fn sample_count(&self) -> usize {
        self.sequences.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.sequences.clear();
    }

    pub fn to_json_string(&self) -> Result<String> {
        let out: Vec<FieldSequence> = self
            .order
            .iter()
            .map(|field| FieldSequence {
                field,
                samples: self.sequence_for(field),
            })
            .collect();
        serde_json::to_string_pretty(&out).context("failed to serialize recorded sequences")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_query() {
        let mut rec = SequenceRecorder::new();
        let g = FieldId::from("gravity");
        rec.record(&g, 0, FieldValue::Vector3([0., 1., 0.]));
        rec.record(&g, 1, FieldValue::Vector3([0., 2., 0.]));

        let seq = rec.sequence_for(&g);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].step_index, 0);
        assert_eq!(seq[1].value, FieldValue::Vector3([0., 2., 0.]));
        assert!(rec.sequence_for(&FieldId::from("missing")).is_empty());
    }

    #[test]
    fn test_fields_in_first_record_order() {
        let mut rec = SequenceRecorder::new();
        rec.record(&FieldId::from("b"), 0, FieldValue::Scalar(1.));
        rec.record(&FieldId::from("a"), 0, FieldValue::Scalar(2.));
        rec.record(&FieldId::from("b"), 1, FieldValue::Scalar(3.));
        let names: Vec<&str> = rec.fields().iter().map(FieldId::as_str).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(rec.sample_count(), 3);
    }

    #[test]
    fn test_clear() {
        let mut rec = SequenceRecorder::new();
        rec.record(&FieldId::from("x"), 0, FieldValue::Scalar(1.));
        rec.clear();
        assert!(rec.is_empty());
        assert_eq!(rec.sample_count(), 0);
    }

    #[test]
    fn test_json_export() -> Result<()> {
        let mut rec = SequenceRecorder::new();
        rec.record(&FieldId::from("g"), 3, FieldValue::Scalar(0.5));
        let json: serde_json::Value = serde_json::from_str(&rec.to_json_string()?)?;
        assert_eq!(json[0]["field"], "g");
        assert_eq!(json[0]["samples"][0]["step_index"], 3);
        Ok(())
    }
}
