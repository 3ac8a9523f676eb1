mod common;

use encoding_rs::UTF_8;
use rust_decimal::Decimal;

use healthcare_csv::{
    catalog::{catalog, select},
    clean::clean,
    config::PipelineConfig,
    duplicates::find_duplicates,
    ingest::{InputOptions, load_records},
    record::RecordStore,
    report::{Metric, Report, ReportEngine},
};

use common::{RowBuilder, TestWorkspace, fixture_path};

fn load(path: &std::path::Path, config: &PipelineConfig) -> RecordStore {
    let options = InputOptions {
        delimiter: b',',
        encoding: UTF_8,
        null_tokens: &config.null_tokens,
    };
    load_records(path, &options).expect("load records")
}

fn run_query(store: &RecordStore, config: &PipelineConfig, name: &str) -> Report {
    let queries = select(catalog(&config.reports), &[name.to_string()], &[]).expect("select");
    ReportEngine::new(store, &config.reports).run(&queries[0])
}

fn percentage_sum(report: &Report) -> Decimal {
    report
        .rows()
        .filter_map(|row| row.values[1].as_decimal())
        .sum()
}

#[test]
fn negative_billing_and_missing_name_are_repaired() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_admissions(
        "one.csv",
        &[RowBuilder::new()
            .name("")
            .gender("FEMALE")
            .billing("-500.00")
            .build()],
    );
    let config = PipelineConfig::default();
    let mut store = load(&input, &config);
    clean(&mut store, &config);

    let record = &store.records()[0];
    assert_eq!(record.admission.billing_amount, Some(Decimal::new(50000, 2)));
    assert_eq!(record.admission.gender.as_deref(), Some("Female"));
    assert_eq!(record.data_issue.as_deref(), Some("Missing Value"));
}

#[test]
fn emergency_billing_average_is_two_hundred() {
    let workspace = TestWorkspace::new();
    let rows = ["100", "200", "300"]
        .iter()
        .map(|amount| {
            RowBuilder::new()
                .admission_type("Emergency")
                .billing(amount)
                .build()
        })
        .collect::<Vec<_>>();
    let input = workspace.write_admissions("emergency.csv", &rows);
    let config = PipelineConfig::default();
    let mut store = load(&input, &config);
    clean(&mut store, &config);

    for name in ["avg_billing_by_admission_type", "billing_by_known_admission_type"] {
        let report = run_query(&store, &config, name);
        let row = report.find(&["Emergency"]).expect("emergency row");
        assert_eq!(row.values[0], Metric::Amount(Decimal::new(20000, 2)));
        assert_eq!(row.values[0].as_display(), "200.00");
    }
}

#[test]
fn top_medications_truncates_to_five() {
    let workspace = TestWorkspace::new();
    let mut rows = Vec::new();
    let medications = [
        ("Aspirin", 8),
        ("Ibuprofen", 7),
        ("Lipitor", 6),
        ("Paracetamol", 5),
        ("Penicillin", 4),
        ("Metformin", 3),
        ("Insulin", 2),
        ("Warfarin", 1),
    ];
    for (medication, count) in medications {
        for idx in 0..count {
            rows.push(
                RowBuilder::new()
                    .name(&format!("{medication} patient {idx}"))
                    .medication(medication)
                    .build(),
            );
        }
    }
    let input = workspace.write_admissions("meds.csv", &rows);
    let config = PipelineConfig::default();
    let store = load(&input, &config);

    let report = run_query(&store, &config, "top_medications");
    let names = report
        .rows()
        .map(|row| row.keys[0].as_display())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["Aspirin", "Ibuprofen", "Lipitor", "Paracetamol", "Penicillin"]
    );
    let counts = report
        .rows()
        .map(|row| row.values[0])
        .collect::<Vec<_>>();
    assert_eq!(
        counts,
        vec![
            Metric::Count(8),
            Metric::Count(7),
            Metric::Count(6),
            Metric::Count(5),
            Metric::Count(4)
        ]
    );
}

#[test]
fn distribution_percentages_sum_to_one_hundred() {
    let config = PipelineConfig::default();
    let mut store = load(&fixture_path("admissions.csv"), &config);
    clean(&mut store, &config);
    for name in ["blood_type_distribution", "test_result_distribution"] {
        let report = run_query(&store, &config, name);
        let total = percentage_sum(&report);
        assert!(
            (total - Decimal::ONE_HUNDRED).abs() <= Decimal::new(1, 1),
            "{name} sums to {total}"
        );
    }
}

#[test]
fn duplicates_exclude_distinct_records() {
    let workspace = TestWorkspace::new();
    let twin = RowBuilder::new().name("Twin").build();
    let input = workspace.write_admissions(
        "dupes.csv",
        &[twin.clone(), RowBuilder::new().name("Solo").build(), twin],
    );
    let config = PipelineConfig::default();
    let store = load(&input, &config);
    let groups = find_duplicates(store.records()).collect::<Vec<_>>();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups[0].admission.name.as_deref(), Some("Twin"));
}

#[test]
fn fixture_reports_are_consistent_after_cleaning() {
    let config = PipelineConfig::default();
    let mut store = load(&fixture_path("admissions.csv"), &config);
    let summary = clean(&mut store, &config);
    assert_eq!(summary.records, 10);
    assert_eq!(summary.changed_by("flag-missing-values"), 3);
    assert_eq!(summary.inverted_stays, 1);

    let monthly = run_query(&store, &config, "monthly_admissions");
    let first = monthly.rows().next().expect("first month");
    assert_eq!(first.keys[0].as_display(), "2019");
    assert_eq!(first.keys[1].as_display(), "8");
    let january = monthly.find(&["2024", "1"]).expect("january 2024");
    assert_eq!(january.values[0], Metric::Count(2));

    let revenue = run_query(&store, &config, "revenue_by_hospital_insurer");
    let top = revenue.rows().next().expect("top revenue");
    assert_eq!(top.keys[0].as_display(), "Nunez-Humphrey");
    assert_eq!(top.values[0].as_display(), "48145.11");
    let cook = revenue.find(&["Cook PLC", "Aetna"]).expect("corrected billing");
    assert_eq!(cook.values[0].as_display(), "27955.10");

    let stays = run_query(&store, &config, "avg_stay_per_doctor");
    let olson = stays.find(&["Kelly olson"]).expect("inverted stay doctor");
    assert_eq!(olson.values[0].as_display(), "-4.00");
}

#[test]
fn every_catalog_query_runs_lazily() {
    let config = PipelineConfig::default();
    let mut store = load(&fixture_path("admissions.csv"), &config);
    clean(&mut store, &config);
    let queries = catalog(&config.reports);
    let engine = ReportEngine::new(&store, &config.reports);
    let mut reports = engine.run_all(&queries);
    let first = reports.next().expect("first report");
    assert_eq!(first.name, "gender_age_groups");
    assert_eq!(reports.count(), queries.len() - 1);
}
