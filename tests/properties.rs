use proptest::prelude::*;
use rust_decimal::Decimal;

use healthcare_csv::{
    clean::{BillingSignCorrector, CleaningStep, MissingValueFlagger, clean},
    config::{PipelineConfig, StayPolicy},
    record::{Admission, HealthcareRecord, RecordStore},
    report::ReportEngine,
    schema::Field,
};

fn gender_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        "(?i)(male|female)".prop_map(Some),
        "[A-Za-z]{1,8}".prop_map(Some),
    ]
}

fn admission_strategy() -> impl Strategy<Value = Admission> {
    (
        proptest::option::of("[A-Za-z ]{1,12}"),
        proptest::option::of(0i64..100),
        gender_strategy(),
        proptest::option::of(prop_oneof![Just("A+"), Just("O-"), Just("AB+")]),
        proptest::option::of(-1_000_000i64..1_000_000),
    )
        .prop_map(|(name, age, gender, blood_type, cents)| Admission {
            name,
            age,
            gender,
            blood_type: blood_type.map(str::to_string),
            billing_amount: cents.map(|cents| Decimal::new(cents, 2)),
            ..Admission::default()
        })
}

fn store_strategy() -> impl Strategy<Value = RecordStore> {
    proptest::collection::vec(admission_strategy(), 1..40)
        .prop_map(|admissions| admissions.into_iter().map(HealthcareRecord::new).collect())
}

proptest! {
    #[test]
    fn sign_correction_is_idempotent_and_non_negative(admission in admission_strategy()) {
        let mut record = HealthcareRecord::new(admission);
        let step = BillingSignCorrector;
        step.apply(&mut record);
        let once = record.clone();
        prop_assert!(!step.apply(&mut record));
        prop_assert_eq!(&record, &once);
        if let Some(amount) = record.admission.billing_amount {
            prop_assert!(amount >= Decimal::ZERO);
        }
    }

    #[test]
    fn missing_value_flag_is_idempotent(admission in admission_strategy()) {
        let missing = admission.name.is_none() || admission.age.is_none() || admission.gender.is_none();
        let mut record = HealthcareRecord::new(admission);
        let step = MissingValueFlagger::new(vec![Field::Name, Field::Age, Field::Gender], "Missing Value");
        prop_assert_eq!(step.apply(&mut record), missing);
        prop_assert!(!step.apply(&mut record));
        prop_assert_eq!(record.data_issue.is_some(), missing);
    }

    #[test]
    fn gender_is_canonical_after_cleaning(mut store in store_strategy()) {
        let before = store
            .records()
            .iter()
            .map(|record| record.admission.gender.clone())
            .collect::<Vec<_>>();
        let config = PipelineConfig::default();
        clean(&mut store, &config);
        for (record, original) in store.records().iter().zip(before) {
            let gender = record.admission.gender.clone();
            match original {
                Some(value) if value.eq_ignore_ascii_case("male") => {
                    prop_assert_eq!(gender.as_deref(), Some("Male"));
                }
                Some(value) if value.eq_ignore_ascii_case("female") => {
                    prop_assert_eq!(gender.as_deref(), Some("Female"));
                }
                other => prop_assert_eq!(gender, other),
            }
        }
    }

    #[test]
    fn second_cleaning_pass_changes_nothing(mut store in store_strategy()) {
        let config = PipelineConfig::default();
        clean(&mut store, &config);
        let version = store.version();
        let snapshot = store.records().to_vec();
        let summary = clean(&mut store, &config);
        prop_assert!(summary.steps.iter().all(|outcome| outcome.changed == 0));
        prop_assert_eq!(store.version(), version);
        prop_assert_eq!(store.records(), snapshot.as_slice());
    }

    #[test]
    fn blood_type_percentages_sum_to_one_hundred(store in store_strategy()) {
        let config = PipelineConfig::default();
        let queries = healthcare_csv::catalog::select(
            healthcare_csv::catalog::catalog(&config.reports),
            &["blood_type_distribution".to_string()],
            &[],
        )
        .expect("catalog query");
        let report = ReportEngine::over(store.records(), StayPolicy::Include).run(&queries[0]);
        let total = report
            .rows()
            .filter_map(|row| row.values[1].as_decimal())
            .sum::<Decimal>();
        prop_assert!((total - Decimal::ONE_HUNDRED).abs() <= Decimal::new(1, 1), "total {}", total);
        let counted = report
            .rows()
            .filter_map(|row| row.values[0].as_decimal())
            .sum::<Decimal>();
        prop_assert_eq!(counted, Decimal::from(store.len()));
    }
}
