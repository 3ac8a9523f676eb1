//! Admission records and the versioned in-memory store the pipeline mutates.

use std::borrow::Cow;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    data::{format_date, is_null_token, parse_integer, parse_money, parse_naive_date},
    error::PipelineError,
    schema::{ColumnType, Field, Layout},
};

/// The fifteen business fields of one admission event.
///
/// Equality and hashing cover every field, so two admissions compare equal
/// exactly when they would be reported as duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Admission {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub medical_condition: Option<String>,
    pub date_of_admission: Option<NaiveDate>,
    pub doctor: Option<String>,
    pub hospital: Option<String>,
    pub insurance_provider: Option<String>,
    pub billing_amount: Option<Decimal>,
    pub room_number: Option<i64>,
    pub admission_type: Option<String>,
    pub discharge_date: Option<NaiveDate>,
    pub medication: Option<String>,
    pub test_results: Option<String>,
}

impl Admission {
    /// Length of stay in calendar days; negative when discharge precedes admission.
    pub fn stay_days(&self) -> Option<i64> {
        match (self.date_of_admission, self.discharge_date) {
            (Some(admitted), Some(discharged)) => Some((discharged - admitted).num_days()),
            _ => None,
        }
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::Name => &self.name,
            Field::Gender => &self.gender,
            Field::BloodType => &self.blood_type,
            Field::MedicalCondition => &self.medical_condition,
            Field::Doctor => &self.doctor,
            Field::Hospital => &self.hospital,
            Field::InsuranceProvider => &self.insurance_provider,
            Field::AdmissionType => &self.admission_type,
            Field::Medication => &self.medication,
            Field::TestResults => &self.test_results,
            _ => return None,
        };
        slot.as_deref()
    }

    pub fn text_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Name => Some(&mut self.name),
            Field::Gender => Some(&mut self.gender),
            Field::BloodType => Some(&mut self.blood_type),
            Field::MedicalCondition => Some(&mut self.medical_condition),
            Field::Doctor => Some(&mut self.doctor),
            Field::Hospital => Some(&mut self.hospital),
            Field::InsuranceProvider => Some(&mut self.insurance_provider),
            Field::AdmissionType => Some(&mut self.admission_type),
            Field::Medication => Some(&mut self.medication),
            Field::TestResults => Some(&mut self.test_results),
            _ => None,
        }
    }

    pub fn is_null(&self, field: Field) -> bool {
        match field {
            Field::Age => self.age.is_none(),
            Field::RoomNumber => self.room_number.is_none(),
            Field::BillingAmount => self.billing_amount.is_none(),
            Field::DateOfAdmission => self.date_of_admission.is_none(),
            Field::DischargeDate => self.discharge_date.is_none(),
            Field::DataIssue => true,
            text => self.text(text).is_none(),
        }
    }

    /// Renders a business field for output; `None` for null cells.
    pub fn display(&self, field: Field) -> Option<Cow<'_, str>> {
        match field {
            Field::Age => self.age.map(|v| Cow::Owned(v.to_string())),
            Field::RoomNumber => self.room_number.map(|v| Cow::Owned(v.to_string())),
            Field::BillingAmount => self.billing_amount.map(|v| Cow::Owned(v.to_string())),
            Field::DateOfAdmission => self.date_of_admission.map(|d| Cow::Owned(format_date(d))),
            Field::DischargeDate => self.discharge_date.map(|d| Cow::Owned(format_date(d))),
            Field::DataIssue => None,
            text => self.text(text).map(Cow::Borrowed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthcareRecord {
    #[serde(flatten)]
    pub admission: Admission,
    pub data_issue: Option<String>,
}

impl HealthcareRecord {
    pub fn new(admission: Admission) -> Self {
        Self {
            admission,
            data_issue: None,
        }
    }

    /// Builds a record from a decoded CSV row. `row_number` is the 1-based
    /// line number used in error messages.
    pub fn from_row(
        layout: &Layout,
        row: &[String],
        null_tokens: &[String],
        row_number: usize,
    ) -> Result<Self, PipelineError> {
        let mut admission = Admission::default();
        for field in Field::BUSINESS {
            let Some(raw) = layout.cell(row, field) else {
                continue;
            };
            if is_null_token(raw, null_tokens) {
                continue;
            }
            let invalid = |err: anyhow::Error| PipelineError::InvalidValue {
                row: row_number,
                field: field.header(),
                value: raw.to_string(),
                reason: err.to_string(),
            };
            match field.column_type() {
                ColumnType::Text => {
                    if let Some(slot) = admission.text_mut(field) {
                        *slot = Some(raw.to_string());
                    }
                }
                ColumnType::Integer => {
                    let parsed = parse_integer(raw).map_err(invalid)?;
                    match field {
                        Field::Age => admission.age = Some(parsed),
                        _ => admission.room_number = Some(parsed),
                    }
                }
                ColumnType::Decimal => {
                    admission.billing_amount = Some(parse_money(raw).map_err(invalid)?);
                }
                ColumnType::Date => {
                    let parsed = parse_naive_date(raw).map_err(invalid)?;
                    match field {
                        Field::DateOfAdmission => admission.date_of_admission = Some(parsed),
                        _ => admission.discharge_date = Some(parsed),
                    }
                }
            }
        }
        let data_issue = layout
            .cell(row, Field::DataIssue)
            .filter(|raw| !is_null_token(raw, null_tokens))
            .map(str::to_string);
        Ok(Self {
            admission,
            data_issue,
        })
    }

    /// Renders all sixteen columns in [`Field::ALL`] order; nulls become empty cells.
    pub fn to_row(&self) -> Vec<String> {
        Field::ALL
            .iter()
            .map(|field| match field {
                Field::DataIssue => self.data_issue.clone().unwrap_or_default(),
                other => self
                    .admission
                    .display(*other)
                    .map(Cow::into_owned)
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Owned record set threaded through the cleaning and reporting stages.
///
/// The version starts at zero and advances once for every mutation pass that
/// changed at least one record.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<HealthcareRecord>,
    version: u64,
}

impl RecordStore {
    pub fn new(records: Vec<HealthcareRecord>) -> Self {
        Self {
            records,
            version: 0,
        }
    }

    pub fn records(&self) -> &[HealthcareRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Applies `update` to every record and returns how many reported a change.
    pub fn update_each<F>(&mut self, mut update: F) -> usize
    where
        F: FnMut(&mut HealthcareRecord) -> bool,
    {
        let mut changed = 0usize;
        for record in &mut self.records {
            if update(record) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.version += 1;
        }
        changed
    }
}

impl FromIterator<HealthcareRecord> for RecordStore {
    fn from_iter<I: IntoIterator<Item = HealthcareRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
