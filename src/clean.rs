//! Cleaning stage: categorical normalization, missing-value flagging, and
//! billing sign correction.
//!
//! Each step is a [`CleaningStep`] that inspects a single record, touches only
//! its own fields, and reports whether it changed anything. Steps are
//! idempotent and order-independent, so a second pass over a cleaned store
//! changes zero records and leaves the store version untouched.

use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    config::{NormalizeRule, PipelineConfig},
    record::{HealthcareRecord, RecordStore},
    schema::Field,
    transform::case::apply_case,
};

pub trait CleaningStep {
    fn name(&self) -> &'static str;

    /// Cleans `record` in place, returning `true` when a field changed.
    fn apply(&self, record: &mut HealthcareRecord) -> bool;
}

pub struct CategoricalNormalizer {
    rules: Vec<NormalizeRule>,
}

impl CategoricalNormalizer {
    pub fn new(rules: Vec<NormalizeRule>) -> Self {
        Self { rules }
    }
}

/// Rewrites `value` per `rule`, returning `None` when the value is outside the
/// rule's allow-list or already canonical.
pub fn normalize_value(rule: &NormalizeRule, value: &str) -> Option<String> {
    if let Some(allow) = &rule.allow
        && !allow.iter().any(|candidate| candidate.eq_ignore_ascii_case(value))
    {
        return None;
    }
    let cased = apply_case(value, rule.style);
    (cased != value).then(|| cased.into_owned())
}

impl CleaningStep for CategoricalNormalizer {
    fn name(&self) -> &'static str {
        "normalize-categories"
    }

    fn apply(&self, record: &mut HealthcareRecord) -> bool {
        let mut changed = false;
        for rule in &self.rules {
            let Some(slot) = record.admission.text_mut(rule.field) else {
                continue;
            };
            let Some(current) = slot.as_deref() else {
                continue;
            };
            if let Some(rewritten) = normalize_value(rule, current) {
                *slot = Some(rewritten);
                changed = true;
            }
        }
        changed
    }
}

pub struct MissingValueFlagger {
    fields: Vec<Field>,
    marker: String,
}

impl MissingValueFlagger {
    pub fn new(fields: Vec<Field>, marker: impl Into<String>) -> Self {
        Self {
            fields,
            marker: marker.into(),
        }
    }
}

impl CleaningStep for MissingValueFlagger {
    fn name(&self) -> &'static str {
        "flag-missing-values"
    }

    fn apply(&self, record: &mut HealthcareRecord) -> bool {
        let missing = self
            .fields
            .iter()
            .any(|field| record.admission.is_null(*field));
        if !missing || record.data_issue.as_deref() == Some(self.marker.as_str()) {
            return false;
        }
        record.data_issue = Some(self.marker.clone());
        true
    }
}

pub struct BillingSignCorrector;

impl CleaningStep for BillingSignCorrector {
    fn name(&self) -> &'static str {
        "correct-billing-sign"
    }

    fn apply(&self, record: &mut HealthcareRecord) -> bool {
        match record.admission.billing_amount {
            Some(amount) if amount < Decimal::ZERO => {
                record.admission.billing_amount = Some(amount.abs());
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: &'static str,
    pub changed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningSummary {
    pub records: usize,
    pub steps: Vec<StepOutcome>,
    pub inverted_stays: usize,
    pub version: u64,
}

impl CleaningSummary {
    pub fn changed_by(&self, step: &str) -> usize {
        self.steps
            .iter()
            .find(|outcome| outcome.step == step)
            .map(|outcome| outcome.changed)
            .unwrap_or(0)
    }
}

pub fn standard_steps(config: &PipelineConfig) -> Vec<Box<dyn CleaningStep>> {
    vec![
        Box::new(CategoricalNormalizer::new(config.normalize.clone())),
        Box::new(MissingValueFlagger::new(
            config.missing_value.fields.clone(),
            config.missing_value.marker.clone(),
        )),
        Box::new(BillingSignCorrector),
    ]
}

pub fn apply_step(store: &mut RecordStore, step: &dyn CleaningStep) -> StepOutcome {
    let changed = store.update_each(|record| step.apply(record));
    debug!("Step '{}' changed {} record(s)", step.name(), changed);
    StepOutcome {
        step: step.name(),
        changed,
    }
}

/// Runs every standard cleaning step over `store`.
pub fn clean(store: &mut RecordStore, config: &PipelineConfig) -> CleaningSummary {
    let steps = standard_steps(config)
        .iter()
        .map(|step| apply_step(store, step.as_ref()))
        .collect::<Vec<_>>();

    let inverted_stays = store
        .records()
        .iter()
        .filter(|record| record.admission.stay_days().is_some_and(|days| days < 0))
        .count();
    if inverted_stays > 0 {
        warn!(
            "{} record(s) have a discharge date before admission; stay policy is {:?}",
            inverted_stays, config.reports.stay_policy
        );
    }

    let summary = CleaningSummary {
        records: store.len(),
        steps,
        inverted_stays,
        version: store.version(),
    };
    info!(
        "Cleaned {} record(s): {}",
        summary.records,
        summary
            .steps
            .iter()
            .map(|outcome| format!("{} changed {}", outcome.step, outcome.changed))
            .collect::<Vec<_>>()
            .join(", ")
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Admission;

    fn gender_rule() -> NormalizeRule {
        NormalizeRule::new(Field::Gender).with_allow(&["male", "female"])
    }

    fn record_with_gender(gender: &str) -> HealthcareRecord {
        HealthcareRecord::new(Admission {
            gender: Some(gender.to_string()),
            ..Admission::default()
        })
    }

    #[test]
    fn gender_variants_collapse_to_two_labels() {
        let step = CategoricalNormalizer::new(vec![gender_rule()]);
        for raw in ["male", "Female", "MALE", "female", "Male"] {
            let mut record = record_with_gender(raw);
            step.apply(&mut record);
            let gender = record.admission.gender.as_deref().unwrap();
            assert!(gender == "Male" || gender == "Female", "{raw} -> {gender}");
        }
    }

    #[test]
    fn gender_outside_allow_list_is_untouched() {
        let step = CategoricalNormalizer::new(vec![gender_rule()]);
        for raw in ["OTHER", "m", "fEmAlE ", "non-binary"] {
            let mut record = record_with_gender(raw);
            assert!(!step.apply(&mut record));
            assert_eq!(record.admission.gender.as_deref(), Some(raw));
        }
    }

    #[test]
    fn unrestricted_rules_rewrite_any_value() {
        let step = CategoricalNormalizer::new(vec![
            NormalizeRule::new(Field::MedicalCondition),
            NormalizeRule::new(Field::Doctor),
        ]);
        let mut record = HealthcareRecord::new(Admission {
            medical_condition: Some("DIABETES".into()),
            doctor: Some("dr. JANE doe".into()),
            ..Admission::default()
        });
        assert!(step.apply(&mut record));
        assert_eq!(record.admission.medical_condition.as_deref(), Some("Diabetes"));
        assert_eq!(record.admission.doctor.as_deref(), Some("Dr. jane doe"));
        assert!(!step.apply(&mut record));
    }

    #[test]
    fn null_values_are_a_no_op() {
        let step = CategoricalNormalizer::new(vec![NormalizeRule::new(Field::Doctor)]);
        let mut record = HealthcareRecord::default();
        assert!(!step.apply(&mut record));
        assert_eq!(record.admission.doctor, None);
    }

    #[test]
    fn flagger_marks_each_required_field() {
        let step = MissingValueFlagger::new(vec![Field::Name, Field::Age, Field::Gender], "Missing Value");
        let complete = Admission {
            name: Some("Ann".into()),
            age: Some(30),
            gender: Some("Female".into()),
            ..Admission::default()
        };
        let mut ok = HealthcareRecord::new(complete.clone());
        assert!(!step.apply(&mut ok));
        assert_eq!(ok.data_issue, None);

        let mut no_age = HealthcareRecord::new(Admission { age: None, ..complete });
        assert!(step.apply(&mut no_age));
        assert_eq!(no_age.data_issue.as_deref(), Some("Missing Value"));
        assert!(!step.apply(&mut no_age));
        assert_eq!(no_age.data_issue.as_deref(), Some("Missing Value"));
    }

    #[test]
    fn sign_corrector_flips_negative_amounts_once() {
        let mut record = HealthcareRecord::new(Admission {
            billing_amount: Some(Decimal::new(-50000, 2)),
            ..Admission::default()
        });
        assert!(BillingSignCorrector.apply(&mut record));
        assert_eq!(record.admission.billing_amount, Some(Decimal::new(50000, 2)));
        assert!(!BillingSignCorrector.apply(&mut record));
    }

    #[test]
    fn clean_handles_the_end_to_end_example() {
        let mut store = RecordStore::new(vec![HealthcareRecord::new(Admission {
            name: None,
            age: Some(51),
            gender: Some("FEMALE".into()),
            billing_amount: Some(Decimal::new(-50000, 2)),
            ..Admission::default()
        })]);
        let summary = clean(&mut store, &PipelineConfig::default());
        let record = &store.records()[0];
        assert_eq!(record.admission.billing_amount, Some(Decimal::new(50000, 2)));
        assert_eq!(record.admission.gender.as_deref(), Some("Female"));
        assert_eq!(record.data_issue.as_deref(), Some("Missing Value"));
        assert_eq!(summary.changed_by("correct-billing-sign"), 1);
        assert_eq!(summary.version, 3);

        let again = clean(&mut store, &PipelineConfig::default());
        assert!(again.steps.iter().all(|outcome| outcome.changed == 0));
        assert_eq!(again.version, 3);
    }

    #[test]
    fn clean_counts_inverted_stays() {
        let admitted = chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let discharged = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut store = RecordStore::new(vec![HealthcareRecord::new(Admission {
            date_of_admission: Some(admitted),
            discharge_date: Some(discharged),
            ..Admission::default()
        })]);
        let summary = clean(&mut store, &PipelineConfig::default());
        assert_eq!(summary.inverted_stays, 1);
    }
}
