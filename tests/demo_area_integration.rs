//! Integration tests running every preset against the bundled demo area.

use std::path::{Path, PathBuf};

use evci_planner::config::PlannerConfig;
use evci_planner::context::RunContext;
use evci_planner::data::load_planning_area;
use evci_planner::eval::CapacityEvaluator;
use evci_planner::plan::Planner;

fn demo_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("demo")
}

#[test]
fn demo_config_file_is_valid() {
    let cfg = PlannerConfig::from_toml_file(&demo_dir().join("planner.toml"));
    assert!(cfg.is_ok(), "demo config should parse: {:?}", cfg.err());
    let errors = cfg.map(|c| c.validate()).unwrap_or_default();
    assert!(errors.is_empty(), "demo config should be valid: {errors:?}");
}

#[test]
fn every_preset_plans_the_demo_area() {
    let inputs = load_planning_area(&demo_dir()).expect("demo area should load");

    for name in PlannerConfig::PRESETS {
        let Ok(config) = PlannerConfig::from_preset(name) else {
            panic!("preset {name} should load");
        };
        let evaluator = CapacityEvaluator::new(config.evaluator.backoff_factor);
        let outcome = Planner::new(&evaluator, &config).run(&RunContext::new(*name), &inputs);
        assert!(outcome.is_ok(), "preset {name} failed: {:?}", outcome.err());

        for o in outcome.iter().flat_map(|o| &o.outcomes) {
            for r in &o.initial.results {
                assert!(r.fractions_in_range(), "preset {name}: {r:?}");
            }
            assert!(o.final_sites.len() <= o.initial.sites.len());
        }
    }
}
