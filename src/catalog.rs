//! The fixed battery of admission reports, grouped into five sections.

use crate::{
    config::ReportConfig,
    error::PipelineError,
    report::{
        Aggregate,
        Direction::{Asc, Desc},
        Filter, GroupKey, Measure, OrderBy, QuerySpec, Section,
    },
    schema::Field,
};

fn count(label: &'static str) -> Aggregate {
    Aggregate::new(Measure::Count, label)
}

fn percentage() -> Aggregate {
    Aggregate::new(Measure::Percentage, "Percentage").rounded(2)
}

fn grouped(
    name: &'static str,
    section: Section,
    title: &'static str,
    group_by: Vec<GroupKey>,
    aggregates: Vec<Aggregate>,
    order: Vec<OrderBy>,
) -> QuerySpec {
    QuerySpec {
        name,
        section,
        title,
        group_by,
        aggregates,
        order,
        limit: None,
        filter: None,
    }
}

pub fn catalog(config: &ReportConfig) -> Vec<QuerySpec> {
    let field = GroupKey::Field;
    vec![
        // Demographics
        grouped(
            "gender_age_groups",
            Section::Demographics,
            "Patients by gender and age group",
            vec![
                field(Field::Gender),
                GroupKey::AgeGroup(config.age_brackets.clone()),
            ],
            vec![count("Patient_Count")],
            vec![OrderBy::Key(0, Asc), OrderBy::Key(1, Asc)],
        ),
        QuerySpec {
            limit: Some(config.top_conditions),
            ..grouped(
                "top_conditions",
                Section::Demographics,
                "Most common medical conditions",
                vec![field(Field::MedicalCondition)],
                vec![count("Patient_Count")],
                vec![OrderBy::Value(0, Desc)],
            )
        },
        grouped(
            "blood_type_distribution",
            Section::Demographics,
            "Blood type distribution",
            vec![field(Field::BloodType)],
            vec![count("Patient_Count"), percentage()],
            vec![OrderBy::Value(0, Desc)],
        ),
        // Admissions
        grouped(
            "admissions_by_hospital",
            Section::Admissions,
            "Admissions per hospital",
            vec![field(Field::Hospital)],
            vec![count("Admissions")],
            vec![OrderBy::Value(0, Desc)],
        ),
        grouped(
            "monthly_admissions",
            Section::Admissions,
            "Monthly admission trend",
            vec![GroupKey::AdmissionYear, GroupKey::AdmissionMonth],
            vec![count("Admissions")],
            vec![OrderBy::Key(0, Asc), OrderBy::Key(1, Asc)],
        ),
        grouped(
            "avg_stay_by_admission_type",
            Section::Admissions,
            "Average length of stay by admission type",
            vec![field(Field::AdmissionType)],
            vec![Aggregate::new(Measure::AvgStayDays, "Avg_Stay_Days").rounded(4)],
            vec![OrderBy::Value(0, Desc)],
        ),
        // Financials
        grouped(
            "avg_billing_by_admission_type",
            Section::Financials,
            "Average billing by admission type",
            vec![field(Field::AdmissionType)],
            vec![Aggregate::new(Measure::AvgBilling, "Avg_Billing").rounded(2)],
            vec![OrderBy::Value(0, Desc)],
        ),
        grouped(
            "revenue_by_hospital_insurer",
            Section::Financials,
            "Revenue by hospital and insurance provider",
            vec![field(Field::Hospital), field(Field::InsuranceProvider)],
            vec![Aggregate::new(Measure::SumBilling, "Total_Revenue").rounded(2)],
            vec![OrderBy::Value(0, Desc)],
        ),
        QuerySpec {
            filter: Some(Filter {
                field: Field::AdmissionType,
                values: config.admission_types.clone(),
            }),
            ..grouped(
                "billing_by_known_admission_type",
                Section::Financials,
                "Average billing for recognized admission types",
                vec![field(Field::AdmissionType)],
                vec![Aggregate::new(Measure::AvgBilling, "Avg_Billing").rounded(2)],
                Vec::new(),
            )
        },
        // Doctors
        QuerySpec {
            limit: Some(config.top_doctors),
            ..grouped(
                "patients_per_doctor",
                Section::Doctors,
                "Doctors with the most patients",
                vec![field(Field::Doctor)],
                vec![count("Patient_Count")],
                vec![OrderBy::Value(0, Desc)],
            )
        },
        grouped(
            "avg_stay_per_doctor",
            Section::Doctors,
            "Average length of stay per doctor",
            vec![field(Field::Doctor)],
            vec![Aggregate::new(Measure::AvgStayDays, "Avg_Stay_Days").rounded(2)],
            vec![OrderBy::Value(0, Desc)],
        ),
        // Tests and medications
        QuerySpec {
            limit: Some(config.top_medications),
            ..grouped(
                "top_medications",
                Section::Tests,
                "Most prescribed medications",
                vec![field(Field::Medication)],
                vec![count("Prescriptions")],
                vec![OrderBy::Value(0, Desc)],
            )
        },
        grouped(
            "test_result_distribution",
            Section::Tests,
            "Test result distribution",
            vec![field(Field::TestResults)],
            vec![count("Patient_Count"), percentage()],
            vec![OrderBy::Value(0, Desc)],
        ),
        grouped(
            "test_result_by_medication",
            Section::Tests,
            "Test results by medication",
            vec![field(Field::TestResults), field(Field::Medication)],
            vec![count("Patient_Count")],
            vec![OrderBy::Key(0, Asc), OrderBy::Value(0, Desc)],
        ),
    ]
}

/// Narrows the catalog to the named queries and sections. Empty selectors keep
/// everything; otherwise a query is kept when it matches either selector.
pub fn select(
    queries: Vec<QuerySpec>,
    names: &[String],
    sections: &[Section],
) -> Result<Vec<QuerySpec>, PipelineError> {
    for name in names {
        if !queries.iter().any(|query| query.name == name.as_str()) {
            return Err(PipelineError::UnknownQuery(name.clone()));
        }
    }
    if names.is_empty() && sections.is_empty() {
        return Ok(queries);
    }
    Ok(queries
        .into_iter()
        .filter(|query| {
            names.iter().any(|name| query.name == name.as_str())
                || sections.contains(&query.section)
        })
        .collect())
}
