//! Integration tests for loading a planning area from disk, planning it with
//! the capacity evaluator and committing the results.

mod common;

use std::fs;

use evci_planner::config::PlannerConfig;
use evci_planner::context::RunContext;
use evci_planner::data::load_planning_area;
use evci_planner::data::loader::{REQUIRED_FILES, SITES_FILE};
use evci_planner::error::PlanError;
use evci_planner::eval::CapacityEvaluator;
use evci_planner::io::sink::{RUN_FILE, SUMMARY_FILE};
use evci_planner::io::{DirectorySink, PlanSink};
use evci_planner::plan::{ChargingType, Planner};

#[test]
fn loads_every_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sites = common::ten_public_places();
    assert!(common::write_planning_area(dir.path(), &sites, &common::grid()).is_ok());

    let inputs = load_planning_area(dir.path()).expect("planning area loads");
    assert_eq!(inputs.sites.len(), 10);
    assert_eq!(inputs.grid.len(), 2);
    assert_eq!(inputs.tables.scenarios.len(), 2);
    assert_eq!(
        inputs.tables.scenario("Public Places").map(|s| s.charger_types.clone()),
        Some(vec!["2W".to_string(), "4WS".to_string()])
    );
    assert_eq!(inputs.tables.traffic_profiles[0].hourly.len(), 24);
    assert_eq!(inputs.sites[2].id, 2);
    assert!(inputs.sites[2].hoarding_kiosk);
    assert!(inputs.sites[2].traffic_profile.is_none());
}

#[test]
fn missing_file_is_data_integrity_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(common::write_planning_area(dir.path(), &common::ten_public_places(), &[]).is_ok());
    assert!(fs::remove_file(dir.path().join(SITES_FILE)).is_ok());

    let err = load_planning_area(dir.path());
    assert!(matches!(err, Err(PlanError::DataIntegrity(ref m)) if m.contains(SITES_FILE)));
    assert!(REQUIRED_FILES.contains(&SITES_FILE));
}

#[test]
fn missing_column_is_data_integrity_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(common::write_planning_area(dir.path(), &common::ten_public_places(), &[]).is_ok());
    assert!(fs::write(dir.path().join("grid.csv"), "name,latitude\nTR-1,15.5\n").is_ok());

    let err = load_planning_area(dir.path());
    assert!(matches!(err, Err(PlanError::DataIntegrity(ref m)) if m.contains("grid.csv")));
}

#[test]
fn capacity_evaluator_plan_stays_in_range() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(
        common::write_planning_area(dir.path(), &common::ten_public_places(), &common::grid())
            .is_ok()
    );
    let Ok(inputs) = load_planning_area(dir.path()) else {
        panic!("load failed");
    };
    let config = PlannerConfig::public_places();
    let evaluator = CapacityEvaluator::new(config.evaluator.backoff_factor);

    let outcome = Planner::new(&evaluator, &config).run(&RunContext::new("capacity"), &inputs);
    let Ok(outcome) = outcome else {
        panic!("plan failed: {:?}", outcome.err());
    };
    assert_eq!(outcome.outcomes.len(), 2);
    for o in &outcome.outcomes {
        assert_eq!(o.initial.results.len(), 10);
        for r in &o.initial.results {
            assert!(r.fractions_in_range());
            assert!(r.capex > 0.0);
            assert!(r.margin > 0.0);
            assert!(r.estimated_vehicles <= r.max_vehicles);
        }
        assert!(o.final_sites.len() <= 10);
        for s in &o.confirmed {
            assert!(o.final_sites.contains(s));
        }
    }
}

#[test]
fn committed_run_contains_every_file() {
    let data = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    assert!(
        common::write_planning_area(data.path(), &common::ten_public_places(), &common::grid())
            .is_ok()
    );
    let Ok(inputs) = load_planning_area(data.path()) else {
        panic!("load failed");
    };
    let eval = common::ScriptedEvaluator::with_busy(10, &common::BUSY);
    let config = PlannerConfig::public_places();
    let ctx = RunContext {
        analysis_id: Some(7),
        created_by: Some(3),
        ..RunContext::new("run-1")
    };

    let Ok(outcome) = Planner::new(&eval, &config).run(&ctx, &inputs) else {
        panic!("plan failed");
    };
    let sink = DirectorySink::new(out.path());
    assert!(sink.commit(&ctx, &outcome).is_ok());

    let run_dir = sink.run_dir("run-1");
    for ct in ChargingType::ALL {
        for stage in ["initial", "cluster"] {
            for ext in ["csv", "json"] {
                let name = format!("{stage}_{ct}_analysis.{ext}");
                assert!(run_dir.join(&name).is_file(), "missing {name}");
            }
        }
        assert!(run_dir.join(format!("dendrogram_{ct}.json")).is_file());
    }
    assert!(run_dir.join(RUN_FILE).is_file());

    let summary = fs::read_to_string(run_dir.join(SUMMARY_FILE)).unwrap_or_default();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 5);
    // 10 sites at 1,000,000 capex each is one crore
    assert_eq!(lines[1], "opportunity_charging,initial,10/10,1.00,0.05,0.02,4%: 3");

    let staged: Vec<_> = fs::read_dir(out.path())
        .map(|rd| rd.filter_map(Result::ok).map(|e| e.file_name()).collect())
        .unwrap_or_default();
    assert_eq!(staged.len(), 1, "only the final run directory remains");
}

#[test]
fn failed_plan_writes_nothing() {
    let out = tempfile::tempdir().expect("tempdir");
    let inputs = common::planning_inputs(common::ten_public_places(), common::grid());
    // site 9 has no script, so the evaluator fails
    let eval = common::ScriptedEvaluator::with_busy(9, &common::BUSY);
    let config = PlannerConfig::public_places();
    let ctx = RunContext::new("broken");

    let result = Planner::new(&eval, &config).run(&ctx, &inputs);
    assert!(matches!(result, Err(PlanError::Evaluation(_))));
    // the binary only commits a successful outcome
    let sink = DirectorySink::new(out.path());
    assert!(!sink.run_dir("broken").exists());
}
