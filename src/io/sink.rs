//! Persistence of completed plans.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::export::{
    dendrogram_file_name, stage_file_name, write_dendrogram_json, write_stage_csv,
    write_stage_json, write_summary_csv,
};
use crate::context::RunContext;
use crate::error::PlanError;
use crate::plan::PlanOutcome;
use crate::plan::engine::StageOutcome;

/// Summary file written next to the stage tables.
pub const SUMMARY_FILE: &str = "summary.csv";
/// Run metadata file.
pub const RUN_FILE: &str = "run.json";

/// Receives a finished plan.
///
/// The planner only hands over an outcome once every stage of every charging
/// type has succeeded; implementations must persist all of it or nothing.
pub trait PlanSink {
    /// Persists `outcome` under the identity in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns a `PlanError` if the outcome could not be stored in full.
    fn commit(&self, ctx: &RunContext, outcome: &PlanOutcome) -> Result<(), PlanError>;
}

/// Writes each run into `<root>/<run_id>/`.
///
/// Files are first written to a hidden staging directory that is renamed into
/// place once complete, so a run directory either holds every file or does
/// not exist.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    run_id: &'a str,
    analysis_id: Option<u64>,
    created_by: Option<u64>,
    final_sites: Vec<(String, usize)>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Final directory of a run.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    fn staging_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(format!(".{run_id}.partial"))
    }

    fn write_all(&self, dir: &Path, ctx: &RunContext, outcome: &PlanOutcome) -> Result<(), PlanError> {
        for o in &outcome.outcomes {
            write_stage(dir, &o.initial)?;
            if let Some(cluster) = &o.cluster {
                write_stage(dir, cluster)?;
            }
            if let Some(dendrogram) = &o.dendrogram {
                write_file(&dir.join(dendrogram_file_name(o.charging_type)), |w| {
                    write_dendrogram_json(dendrogram, w)
                })?;
            }
        }

        write_file(&dir.join(SUMMARY_FILE), |w| write_summary_csv(outcome, w))?;

        let metadata = RunMetadata {
            run_id: &ctx.run_id,
            analysis_id: ctx.analysis_id,
            created_by: ctx.created_by,
            final_sites: outcome
                .outcomes
                .iter()
                .map(|o| (o.charging_type.to_string(), o.final_sites.len()))
                .collect(),
        };
        write_file(&dir.join(RUN_FILE), |w| {
            serde_json::to_writer_pretty(&mut *w, &metadata)?;
            w.flush()?;
            Ok(())
        })
    }
}

/// Creates `path`, fills it through `fill` and syncs it to disk.
///
/// A buffered write that fails only on the final flush surfaces here instead
/// of being dropped with the writer.
fn write_file<F>(path: &Path, fill: F) -> Result<(), PlanError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), PlanError>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    fill(&mut writer)?;
    let file = writer.into_inner().map_err(|e| PlanError::from(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

fn write_stage(dir: &Path, stage: &StageOutcome) -> Result<(), PlanError> {
    let ct = stage.report.charging_type;
    write_file(&dir.join(stage_file_name(stage.stage, ct, "csv")), |w| {
        write_stage_csv(stage, w)
    })?;
    write_file(&dir.join(stage_file_name(stage.stage, ct, "json")), |w| {
        write_stage_json(stage, w)
    })
}

impl PlanSink for DirectorySink {
    fn commit(&self, ctx: &RunContext, outcome: &PlanOutcome) -> Result<(), PlanError> {
        let target = self.run_dir(&ctx.run_id);
        if target.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("run directory \"{}\" already exists", target.display()),
            )
            .into());
        }

        let staging = self.staging_dir(&ctx.run_id);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let written = self
            .write_all(&staging, ctx, outcome)
            .and_then(|()| fs::rename(&staging, &target).map_err(PlanError::from));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(dir = %staging.display(), error = %cleanup, "staging cleanup failed");
            }
            return Err(e);
        }

        info!(run_id = %ctx.run_id, dir = %target.display(), "plan committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_outcome(run_id: &str) -> PlanOutcome {
        PlanOutcome {
            run_id: run_id.to_string(),
            outcomes: Vec::new(),
        }
    }

    #[test]
    fn commit_moves_staging_into_place() {
        let root = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(root.path());
        let ctx = RunContext::new("r1");
        assert!(sink.commit(&ctx, &empty_outcome("r1")).is_ok());
        assert!(sink.run_dir("r1").join(SUMMARY_FILE).is_file());
        assert!(sink.run_dir("r1").join(RUN_FILE).is_file());
        assert!(!sink.staging_dir("r1").exists());
    }

    #[test]
    fn existing_run_directory_is_not_overwritten() {
        let root = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(root.path());
        let ctx = RunContext::new("r1");
        assert!(sink.commit(&ctx, &empty_outcome("r1")).is_ok());
        let err = sink.commit(&ctx, &empty_outcome("r1"));
        assert!(matches!(err, Err(PlanError::Io(_))));
        assert!(!sink.staging_dir("r1").exists());
    }

    #[test]
    fn written_files_hold_their_full_content() {
        let root = tempfile::tempdir().expect("tempdir");
        let path = root.path().join("payload.json");
        let payload: Vec<u32> = (0..10_000).collect();
        write_file(&path, |w| {
            serde_json::to_writer(&mut *w, &payload)?;
            Ok(())
        })
        .expect("write_file");
        let text = fs::read_to_string(&path).expect("read back");
        let parsed: Vec<u32> = serde_json::from_str(&text).expect("complete JSON");
        assert_eq!(parsed, payload);
    }

    #[test]
    fn write_file_propagates_fill_errors() {
        let root = tempfile::tempdir().expect("tempdir");
        let err = write_file(&root.path().join("broken.json"), |_| {
            Err(PlanError::integrity("fill failed"))
        });
        assert!(matches!(err, Err(PlanError::DataIntegrity(_))));
    }
}
