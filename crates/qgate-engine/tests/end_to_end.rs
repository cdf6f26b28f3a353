use std::time::Duration;

use proptest::prelude::*;
use qgate_core::{Options, Session, Summary};
use qgate_engine::{
    Aggregate, BaselinePolicy, Decision, GatePolicy, PatternBudget, evaluate, render_markdown,
};
use qgate_security::Pipeline;

fn capture(dir: &std::path::Path, name: &str, queries: &[(&str, u64)], top: Option<i64>) -> Summary {
    let options = Options::builder()
        .redactors(Pipeline::recommended())
        .build();
    let session = Session::start(options);
    for (text, ms) in queries {
        session
            .record(text, Duration::from_millis(*ms), None)
            .unwrap();
    }
    let path = dir.join(name);
    session
        .stop()
        .unwrap()
        .to_summary(top)
        .export_to_file(&path)
        .unwrap();
    Summary::load(&path).unwrap()
}

#[test]
fn test_capture_export_aggregate_gate() {
    let dir = tempfile::tempdir().unwrap();

    let api = capture(
        dir.path(),
        "api.json",
        &[
            ("SELECT * FROM Users WHERE Email = 'ann@example.com'", 3),
            ("SELECT   *  FROM Users WHERE Id = 42", 5),
        ],
        None,
    );
    let worker = capture(
        dir.path(),
        "worker.json",
        &[("UPDATE Jobs SET Token = 'a3f9c2e8d1b4a7f6e5d4c3b2a1f0e9d8'", 2)],
        None,
    );

    // redaction ran at record time
    assert!(api.events[0].text.contains("[REDACTED:EMAIL]"));
    assert_eq!(api.events[1].text, "SELECT * FROM Users WHERE Id = 42");
    assert!(!worker.events[0].text.contains("a3f9c2e8"));

    let agg = Aggregate::from_summaries([&api, &worker]);
    assert_eq!(agg.total_queries, 3);
    assert!((agg.total_duration_ms - 10.0).abs() < 1e-9);

    let policy = GatePolicy {
        budgets: vec![PatternBudget::parse("SELECT * FROM Users*=1").unwrap()],
        ..Default::default()
    };
    let eval = evaluate(&agg, &policy);
    assert_eq!(eval.decision, Decision::BudgetExceeded);
    assert_eq!(eval.patterns[0].count, 2);

    let md = render_markdown(&agg, &eval);
    assert!(md.contains("Budget exceeded"));
    assert!(md.contains("matched 2 event(s), max 1"));
}

#[test]
fn test_baseline_written_then_compared() {
    let dir = tempfile::tempdir().unwrap();
    let ten: Vec<(&str, u64)> = vec![("SELECT 1", 1); 10];
    let first = capture(dir.path(), "first.json", &ten, None);

    let baseline_path = dir.path().join("baseline.json");
    Aggregate::from_summaries([&first])
        .to_baseline()
        .export_to_file(&baseline_path)
        .unwrap();
    let baseline = Summary::load(&baseline_path).unwrap();

    let policy = GatePolicy {
        baseline: Some(BaselinePolicy::new(baseline, 20.0)),
        ..Default::default()
    };

    let twelve = capture(dir.path(), "twelve.json", &vec![("SELECT 1", 1); 12], None);
    let eval = evaluate(&Aggregate::from_summaries([&twelve]), &policy);
    assert_eq!(eval.decision, Decision::Ok);

    let thirteen = capture(dir.path(), "thirteen.json", &vec![("SELECT 1", 1); 13], None);
    let eval = evaluate(&Aggregate::from_summaries([&thirteen]), &policy);
    assert_eq!(eval.decision, Decision::BaselineRegression);
}

#[test]
fn test_sampled_inputs_are_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let sampled = capture(
        dir.path(),
        "sampled.json",
        &[("SELECT 1", 1), ("SELECT 2", 9), ("SELECT 3", 4)],
        Some(1),
    );
    assert_eq!(sampled.events.len(), 1);
    assert_eq!(sampled.events[0].text, "SELECT 2");

    let agg = Aggregate::from_summaries([&sampled]);
    assert!(agg.sampled);
    assert_eq!(agg.total_queries, 3);
}

proptest! {
    #[test]
    fn prop_aggregate_sums_inputs(counts in prop::collection::vec((0u64..500, 0u32..10_000), 0..6)) {
        let summaries: Vec<Summary> = counts
            .iter()
            .map(|(queries, total)| {
                let mut s = Aggregate::default().to_baseline();
                s.total_queries = *queries;
                s.total_duration_ms = f64::from(*total);
                s
            })
            .collect();

        let agg = Aggregate::from_summaries(&summaries);
        let queries: u64 = counts.iter().map(|(q, _)| q).sum();
        let total: f64 = counts.iter().map(|(_, t)| f64::from(*t)).sum();

        prop_assert_eq!(agg.file_count, counts.len());
        prop_assert_eq!(agg.total_queries, queries);
        prop_assert!((agg.total_duration_ms - total).abs() < 1e-6);
        if queries == 0 {
            prop_assert_eq!(agg.average_duration_ms, 0.0);
        } else {
            prop_assert!((agg.average_duration_ms - total / queries as f64).abs() < 1e-6);
        }
    }
}
