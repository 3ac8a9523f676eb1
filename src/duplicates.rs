use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    record::{Admission, HealthcareRecord},
    schema::Field,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup<'a> {
    pub admission: &'a Admission,
    pub count: usize,
    /// Index of the first record carrying this admission tuple.
    pub first_index: usize,
}

impl DuplicateGroup<'_> {
    /// The fifteen business fields followed by the occurrence count.
    pub fn to_row(&self) -> Vec<String> {
        Field::BUSINESS
            .iter()
            .map(|field| {
                self.admission
                    .display(*field)
                    .map(|value| value.into_owned())
                    .unwrap_or_default()
            })
            .chain(std::iter::once(self.count.to_string()))
            .collect()
    }
}

pub fn duplicate_headers() -> Vec<String> {
    Field::BUSINESS
        .iter()
        .map(|field| field.header().to_string())
        .chain(std::iter::once("Occurrences".to_string()))
        .collect()
}

/// Yields every admission tuple seen more than once, in order of first
/// appearance. Data_Issue does not participate in the comparison.
pub fn find_duplicates(
    records: &[HealthcareRecord],
) -> impl Iterator<Item = DuplicateGroup<'_>> + '_ {
    let mut seen: HashMap<&Admission, (usize, usize)> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        seen.entry(&record.admission).or_insert((idx, 0)).1 += 1;
    }
    seen.into_iter()
        .filter(|(_, (_, count))| *count > 1)
        .sorted_by_key(|(_, (first_index, _))| *first_index)
        .map(|(admission, (first_index, count))| DuplicateGroup {
            admission,
            count,
            first_index,
        })
}
