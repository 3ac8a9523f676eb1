//! Pipeline configuration loaded from YAML.
//!
//! Every key is optional; the defaults reproduce the standard cleaning rules
//! (capitalize Gender within {male, female}, Medical_Condition and Doctor
//! unconditionally; flag rows missing Name, Age or Gender) and the standard
//! report catalog limits.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{error::PipelineError, schema::Field};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    /// First character upper-cased, remainder lower-cased.
    #[default]
    Capitalize,
    /// Every word capitalized.
    Title,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeRule {
    pub field: Field,
    #[serde(default)]
    pub style: CaseStyle,
    /// Only values matching one of these (case-insensitively) are rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
}

impl NormalizeRule {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            style: CaseStyle::default(),
            allow: None,
        }
    }

    pub fn with_allow(mut self, values: &[&str]) -> Self {
        self.allow = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingValueConfig {
    pub fields: Vec<Field>,
    pub marker: String,
}

impl Default for MissingValueConfig {
    fn default() -> Self {
        Self {
            fields: vec![Field::Name, Field::Age, Field::Gender],
            marker: "Missing Value".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StayPolicy {
    /// Average every computed stay, including negative ones.
    #[default]
    Include,
    /// Skip stays where the discharge date precedes admission.
    ExcludeNegative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub age_brackets: Vec<i64>,
    pub top_conditions: usize,
    pub top_doctors: usize,
    pub top_medications: usize,
    pub admission_types: Vec<String>,
    pub stay_policy: StayPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            age_brackets: vec![20, 40, 60],
            top_conditions: 5,
            top_doctors: 10,
            top_medications: 5,
            admission_types: vec![
                "Emergency".to_string(),
                "Urgent".to_string(),
                "Elective".to_string(),
            ],
            stay_policy: StayPolicy::Include,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub null_tokens: Vec<String>,
    pub normalize: Vec<NormalizeRule>,
    pub missing_value: MissingValueConfig,
    pub reports: ReportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            null_tokens: vec!["NULL".to_string(), "\\N".to_string()],
            normalize: vec![
                NormalizeRule::new(Field::Gender).with_allow(&["male", "female"]),
                NormalizeRule::new(Field::MedicalCondition),
                NormalizeRule::new(Field::Doctor),
            ],
            missing_value: MissingValueConfig::default(),
            reports: ReportConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: PipelineConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(raw).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config YAML")
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        for rule in &self.normalize {
            if !rule.field.is_text() {
                return Err(PipelineError::NotTextField(rule.field.header()));
            }
        }
        if self.missing_value.fields.contains(&Field::DataIssue) {
            return Err(PipelineError::InvalidConfig(
                "missing_value.fields cannot include Data_Issue".to_string(),
            ));
        }
        let brackets = &self.reports.age_brackets;
        if brackets.first().is_some_and(|first| *first <= 0)
            || brackets.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(PipelineError::InvalidConfig(format!(
                "age_brackets must be positive and strictly ascending, got {brackets:?}"
            )));
        }
        let limits = [
            ("top_conditions", self.reports.top_conditions),
            ("top_doctors", self.reports.top_doctors),
            ("top_medications", self.reports.top_medications),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(PipelineError::InvalidConfig(format!(
                "{name} must be greater than zero"
            )));
        }
        Ok(())
    }
}
