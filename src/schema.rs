//! Column model for the admissions table.
//!
//! [`Field`] names the sixteen columns of a healthcare admission record and
//! carries each column's canonical header and [`ColumnType`]. [`Layout`]
//! resolves the header row of an input file to field positions, tolerating
//! spacing and casing differences (`Blood Type`, `blood_type`, `Blood_Type`).

use std::{fmt, str::FromStr};

use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{data::normalize_column_name, error::PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Age,
    Gender,
    BloodType,
    MedicalCondition,
    DateOfAdmission,
    Doctor,
    Hospital,
    InsuranceProvider,
    BillingAmount,
    RoomNumber,
    AdmissionType,
    DischargeDate,
    Medication,
    TestResults,
    DataIssue,
}

impl Field {
    /// All columns in canonical output order.
    pub const ALL: [Field; 16] = [
        Field::Name,
        Field::Age,
        Field::Gender,
        Field::BloodType,
        Field::MedicalCondition,
        Field::DateOfAdmission,
        Field::Doctor,
        Field::Hospital,
        Field::InsuranceProvider,
        Field::BillingAmount,
        Field::RoomNumber,
        Field::AdmissionType,
        Field::DischargeDate,
        Field::Medication,
        Field::TestResults,
        Field::DataIssue,
    ];

    /// The fifteen business columns that make up an admission tuple.
    pub const BUSINESS: [Field; 15] = [
        Field::Name,
        Field::Age,
        Field::Gender,
        Field::BloodType,
        Field::MedicalCondition,
        Field::DateOfAdmission,
        Field::Doctor,
        Field::Hospital,
        Field::InsuranceProvider,
        Field::BillingAmount,
        Field::RoomNumber,
        Field::AdmissionType,
        Field::DischargeDate,
        Field::Medication,
        Field::TestResults,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Age => "Age",
            Field::Gender => "Gender",
            Field::BloodType => "Blood_Type",
            Field::MedicalCondition => "Medical_Condition",
            Field::DateOfAdmission => "Date_of_Admission",
            Field::Doctor => "Doctor",
            Field::Hospital => "Hospital",
            Field::InsuranceProvider => "Insurance_Provider",
            Field::BillingAmount => "Billing_Amount",
            Field::RoomNumber => "Room_Number",
            Field::AdmissionType => "Admission_Type",
            Field::DischargeDate => "Discharge_Date",
            Field::Medication => "Medication",
            Field::TestResults => "Test_Results",
            Field::DataIssue => "Data_Issue",
        }
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            Field::Age | Field::RoomNumber => ColumnType::Integer,
            Field::BillingAmount => ColumnType::Decimal,
            Field::DateOfAdmission | Field::DischargeDate => ColumnType::Date,
            _ => ColumnType::Text,
        }
    }

    pub fn is_text(self) -> bool {
        self.column_type() == ColumnType::Text
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn headers() -> Vec<String> {
        Field::ALL.iter().map(|f| f.header().to_string()).collect()
    }

    /// Matches a header after normalizing case and separators.
    pub fn from_header(header: &str) -> Option<Field> {
        let normalized = normalize_column_name(header);
        Field::ALL
            .into_iter()
            .find(|field| normalize_column_name(field.header()) == normalized)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Field {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Field::from_header(value).ok_or_else(|| PipelineError::UnknownField(value.to_string()))
    }
}

impl Serialize for Field {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.header())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Field::from_str(&token).map_err(de::Error::custom)
    }
}

/// Position of every known field within an input file's header row.
#[derive(Debug, Clone)]
pub struct Layout {
    positions: [Option<usize>; 16],
    width: usize,
}

impl Layout {
    pub fn resolve(headers: &[String]) -> Result<Self, PipelineError> {
        let mut positions: [Option<usize>; 16] = [None; 16];
        for (idx, header) in headers.iter().enumerate() {
            let Some(field) = Field::from_header(header) else {
                warn!("Ignoring unrecognized column '{header}'");
                continue;
            };
            if let Some(previous) = positions[field.index()] {
                return Err(PipelineError::DuplicateColumn {
                    field: field.header(),
                    first: headers[previous].clone(),
                    second: header.clone(),
                });
            }
            positions[field.index()] = Some(idx);
        }
        for field in Field::BUSINESS {
            if positions[field.index()].is_none() {
                return Err(PipelineError::MissingColumn(field.header()));
            }
        }
        Ok(Self {
            positions,
            width: headers.len(),
        })
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions[field.index()]
    }

    pub fn has(&self, field: Field) -> bool {
        self.position(field).is_some()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the raw cell for `field`, or `None` when the column is absent.
    pub fn cell<'a>(&self, row: &'a [String], field: Field) -> Option<&'a str> {
        self.position(field)
            .map(|idx| row.get(idx).map(String::as_str).unwrap_or(""))
    }
}
