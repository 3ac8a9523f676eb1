//! Aggregate reporting engine.
//!
//! A [`QuerySpec`] describes one grouped aggregate over the record store:
//! grouping keys, aggregates, ordering, an optional row limit, and an optional
//! `IN`-list filter. [`ReportEngine`] evaluates specs against a borrowed store
//! and never mutates it, so queries may run in any order.

use std::{cmp::Ordering, collections::HashMap, fmt};

use chrono::Datelike;
use clap::ValueEnum;
use log::warn;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};

use crate::{
    config::{ReportConfig, StayPolicy},
    record::{Admission, HealthcareRecord, RecordStore},
    schema::Field,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum Section {
    Demographics,
    Admissions,
    Financials,
    Doctors,
    Tests,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Demographics => "demographics",
            Section::Admissions => "admissions",
            Section::Financials => "financials",
            Section::Doctors => "doctors",
            Section::Tests => "tests",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    Field(Field),
    /// Age bracket derived from ascending lower bounds, e.g. `[20, 40, 60]`
    /// yields `Under 20`, `20-39`, `40-59`, `60+`.
    AgeGroup(Vec<i64>),
    AdmissionYear,
    AdmissionMonth,
}

impl GroupKey {
    pub fn label(&self) -> String {
        match self {
            GroupKey::Field(field) => field.header().to_string(),
            GroupKey::AgeGroup(_) => "Age_Group".to_string(),
            GroupKey::AdmissionYear => "Admission_Year".to_string(),
            GroupKey::AdmissionMonth => "Admission_Month".to_string(),
        }
    }

    fn extract(&self, admission: &Admission) -> GroupValue {
        match self {
            GroupKey::Field(field) => match admission.display(*field) {
                Some(value) => GroupValue::Text(value.into_owned()),
                None => GroupValue::Null,
            },
            GroupKey::AgeGroup(bounds) => admission
                .age
                .map(|age| age_bracket(age, bounds))
                .unwrap_or(GroupValue::Null),
            GroupKey::AdmissionYear => admission
                .date_of_admission
                .map(|date| GroupValue::Int(i64::from(date.year())))
                .unwrap_or(GroupValue::Null),
            GroupKey::AdmissionMonth => admission
                .date_of_admission
                .map(|date| GroupValue::Int(i64::from(date.month())))
                .unwrap_or(GroupValue::Null),
        }
    }
}

pub fn age_bracket(age: i64, bounds: &[i64]) -> GroupValue {
    let rank = bounds.iter().take_while(|bound| age >= **bound).count();
    let label = match (rank, bounds.first(), bounds.last()) {
        (_, None, _) | (_, _, None) => "All".to_string(),
        (0, Some(first), _) => format!("Under {first}"),
        (r, _, Some(last)) if r == bounds.len() => format!("{last}+"),
        (r, _, _) => format!("{}-{}", bounds[r - 1], bounds[r] - 1),
    };
    GroupValue::Bracket { rank, label }
}

/// One grouping cell. Variants order as `Null` first, mirroring SQL's
/// ascending sort of NULL keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupValue {
    Null,
    Int(i64),
    Bracket { rank: usize, label: String },
    Text(String),
}

impl GroupValue {
    pub fn as_display(&self) -> String {
        match self {
            GroupValue::Null => "NULL".to_string(),
            GroupValue::Int(value) => value.to_string(),
            GroupValue::Bracket { label, .. } => label.clone(),
            GroupValue::Text(value) => value.clone(),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            GroupValue::Null => JsonValue::Null,
            GroupValue::Int(value) => json!(value),
            GroupValue::Bracket { label, .. } => json!(label),
            GroupValue::Text(value) => json!(value),
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Count,
    /// Share of the rows the query saw, in percent.
    Percentage,
    AvgBilling,
    SumBilling,
    AvgStayDays,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub measure: Measure,
    pub label: &'static str,
    /// Decimal places; results are rounded half away from zero.
    pub scale: Option<u32>,
}

impl Aggregate {
    pub fn new(measure: Measure, label: &'static str) -> Self {
        Self {
            measure,
            label,
            scale: None,
        }
    }

    pub fn rounded(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// Position within `group_by`.
    Key(usize, Direction),
    /// Position within `aggregates`.
    Value(usize, Direction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: Field,
    pub values: Vec<String>,
}

impl Filter {
    fn matches(&self, admission: &Admission) -> bool {
        admission.display(self.field).is_some_and(|value| {
            self.values
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(&value))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub name: &'static str,
    pub section: Section,
    pub title: &'static str,
    pub group_by: Vec<GroupKey>,
    pub aggregates: Vec<Aggregate>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Count(u64),
    Amount(Decimal),
    /// Average or sum over zero non-null inputs.
    Null,
}

impl Metric {
    fn sort_value(&self) -> Option<Decimal> {
        match self {
            Metric::Count(count) => Some(Decimal::from(*count)),
            Metric::Amount(amount) => Some(*amount),
            Metric::Null => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        self.sort_value()
    }

    pub fn as_display(&self) -> String {
        match self {
            Metric::Count(count) => count.to_string(),
            Metric::Amount(amount) => amount.to_string(),
            Metric::Null => "NULL".to_string(),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Metric::Count(count) => json!(count),
            Metric::Amount(amount) => amount
                .to_f64()
                .map(|value| json!(value))
                .unwrap_or_else(|| json!(amount.to_string())),
            Metric::Null => JsonValue::Null,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub keys: Vec<GroupValue>,
    pub values: Vec<Metric>,
}

impl ReportRow {
    pub fn to_strings(&self) -> Vec<String> {
        self.keys
            .iter()
            .map(GroupValue::as_display)
            .chain(self.values.iter().map(Metric::as_display))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub name: &'static str,
    pub section: Section,
    pub title: &'static str,
    pub columns: Vec<String>,
    /// Number of leading columns that are grouping keys.
    pub key_columns: usize,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter()
    }

    pub fn string_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(ReportRow::to_strings).collect()
    }

    /// Finds the row whose grouping keys render as `keys`.
    pub fn find(&self, keys: &[&str]) -> Option<&ReportRow> {
        self.rows.iter().find(|row| {
            row.keys.len() == keys.len()
                && row
                    .keys
                    .iter()
                    .zip(keys)
                    .all(|(value, expected)| value.as_display() == *expected)
        })
    }

    pub fn to_json(&self) -> JsonValue {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                let cells = row
                    .keys
                    .iter()
                    .map(GroupValue::to_json)
                    .chain(row.values.iter().map(Metric::to_json));
                for (column, cell) in self.columns.iter().zip(cells) {
                    object.insert(column.clone(), cell);
                }
                JsonValue::Object(object)
            })
            .collect::<Vec<_>>();
        json!({
            "name": self.name,
            "section": self.section.as_str(),
            "title": self.title,
            "columns": self.columns,
            "rows": rows,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct GroupAccumulator {
    rows: u64,
    billing_total: Decimal,
    billing_rows: u64,
    /// Set once the billing sum leaves the range `Decimal` can represent.
    billing_overflow: bool,
    stay_total: i64,
    stay_rows: u64,
}

impl GroupAccumulator {
    fn ingest(&mut self, admission: &Admission, stay_policy: StayPolicy) {
        self.rows += 1;
        if let Some(amount) = admission.billing_amount {
            match self.billing_total.checked_add(amount) {
                Some(total) => self.billing_total = total,
                None => self.billing_overflow = true,
            }
            self.billing_rows += 1;
        }
        let stay = admission.stay_days().filter(|days| match stay_policy {
            StayPolicy::Include => true,
            StayPolicy::ExcludeNegative => *days >= 0,
        });
        if let Some(days) = stay {
            self.stay_total += days;
            self.stay_rows += 1;
        }
    }

    fn evaluate(&self, aggregate: &Aggregate, total_rows: u64) -> Metric {
        let raw = match aggregate.measure {
            Measure::Count => return Metric::Count(self.rows),
            Measure::Percentage => {
                if total_rows == 0 {
                    return Metric::Null;
                }
                Decimal::from(self.rows) * Decimal::ONE_HUNDRED / Decimal::from(total_rows)
            }
            Measure::AvgBilling => {
                if self.billing_rows == 0 || self.billing_overflow {
                    return Metric::Null;
                }
                self.billing_total / Decimal::from(self.billing_rows)
            }
            Measure::SumBilling => {
                if self.billing_rows == 0 || self.billing_overflow {
                    return Metric::Null;
                }
                self.billing_total
            }
            Measure::AvgStayDays => {
                if self.stay_rows == 0 {
                    return Metric::Null;
                }
                Decimal::from(self.stay_total) / Decimal::from(self.stay_rows)
            }
        };
        Metric::Amount(match aggregate.scale {
            Some(scale) => round_to(raw, scale),
            None => raw,
        })
    }
}

pub fn round_to(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

fn compare_rows(left: &ReportRow, right: &ReportRow, order: &[OrderBy]) -> Ordering {
    for term in order {
        let (ordering, direction) = match *term {
            OrderBy::Key(idx, direction) => (left.keys[idx].cmp(&right.keys[idx]), direction),
            OrderBy::Value(idx, direction) => (
                left.values[idx]
                    .sort_value()
                    .cmp(&right.values[idx].sort_value()),
                direction,
            ),
        };
        let ordering = match direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.keys.cmp(&right.keys)
}

impl QuerySpec {
    pub fn columns(&self) -> Vec<String> {
        self.group_by
            .iter()
            .map(GroupKey::label)
            .chain(self.aggregates.iter().map(|agg| agg.label.to_string()))
            .collect()
    }

    pub fn execute(&self, records: &[HealthcareRecord], stay_policy: StayPolicy) -> Report {
        let mut groups: HashMap<Vec<GroupValue>, GroupAccumulator> = HashMap::new();
        let mut total_rows = 0u64;
        for record in records {
            let admission = &record.admission;
            if let Some(filter) = &self.filter
                && !filter.matches(admission)
            {
                continue;
            }
            total_rows += 1;
            let key = self
                .group_by
                .iter()
                .map(|group| group.extract(admission))
                .collect::<Vec<_>>();
            groups
                .entry(key)
                .or_default()
                .ingest(admission, stay_policy);
        }

        let overflowed = groups.values().filter(|acc| acc.billing_overflow).count();
        if overflowed > 0
            && self
                .aggregates
                .iter()
                .any(|agg| matches!(agg.measure, Measure::AvgBilling | Measure::SumBilling))
        {
            warn!(
                "Query '{}': billing total overflowed in {} group(s); reporting NULL",
                self.name, overflowed
            );
        }

        let mut rows = groups
            .into_iter()
            .map(|(keys, acc)| ReportRow {
                values: self
                    .aggregates
                    .iter()
                    .map(|aggregate| acc.evaluate(aggregate, total_rows))
                    .collect(),
                keys,
            })
            .collect::<Vec<_>>();
        rows.sort_by(|left, right| compare_rows(left, right, &self.order));
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        Report {
            name: self.name,
            section: self.section,
            title: self.title,
            columns: self.columns(),
            key_columns: self.group_by.len(),
            rows,
        }
    }
}

/// Runs queries against a borrowed, already-cleaned store.
pub struct ReportEngine<'a> {
    records: &'a [HealthcareRecord],
    stay_policy: StayPolicy,
}

impl<'a> ReportEngine<'a> {
    pub fn new(store: &'a RecordStore, config: &ReportConfig) -> Self {
        Self::over(store.records(), config.stay_policy)
    }

    pub fn over(records: &'a [HealthcareRecord], stay_policy: StayPolicy) -> Self {
        Self {
            records,
            stay_policy,
        }
    }

    pub fn run(&self, query: &QuerySpec) -> Report {
        query.execute(self.records, self.stay_policy)
    }

    /// Executes each query only when its report is pulled from the iterator.
    pub fn run_all<'q>(&'q self, queries: &'q [QuerySpec]) -> impl Iterator<Item = Report> + 'q {
        queries
            .iter()
            .map(move |query| query.execute(self.records, self.stay_policy))
    }
}
