//! Per-state batch runs.
//!
//! One [`Task`] per region. Tasks run in input order when a single worker is
//! configured, otherwise a fixed pool of workers drains a shared queue. A task
//! never fails the run: fetch problems degrade to whatever data came back and
//! write problems are reported on that task alone.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::columns::ColumnMap;
use crate::config::{ListingType, OutputFormat, RunConfig};
use crate::export;
use crate::fetch::{fetch_region, PropertySource};

/// One unit of work, consumed once by a worker
#[derive(Debug, Clone)]
pub(crate) struct Task {
    pub(crate) region: String,
    pub(crate) listing_types: Vec<ListingType>,
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
    pub(crate) row_cap: usize,
    pub(crate) output_dir: PathBuf,
    pub(crate) output_format: OutputFormat,
    pub(crate) overwrite: bool,
    pub(crate) extra_property_data: bool,
    pub(crate) columns: Arc<ColumnMap>,
}

impl Task {
    pub(crate) fn target_path(&self) -> PathBuf {
        export::target_path(&self.output_dir, &self.region, self.output_format)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TaskOutcome {
    Skipped(PathBuf),
    NoData,
    Exported { path: PathBuf, rows: usize },
    Failed(String),
}

impl TaskOutcome {
    pub(crate) fn describe(&self, region: &str) -> String {
        match self {
            TaskOutcome::Skipped(path) => format!("Skipping {}, already exists.", path.display()),
            TaskOutcome::NoData => format!("No data for {}", region),
            TaskOutcome::Exported { path, rows } => {
                format!("Saved {} properties for {} to {}", rows, region, path.display())
            }
            TaskOutcome::Failed(reason) => format!("Failed to export {}: {}", region, reason),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RunSummary {
    pub(crate) outcomes: Vec<(String, TaskOutcome)>,
}

impl RunSummary {
    pub(crate) fn exported(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TaskOutcome::Exported { .. }))
            .count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let skipped = self.outcomes.iter().filter(|(_, o)| matches!(o, TaskOutcome::Skipped(_))).count();
        let no_data = self.outcomes.iter().filter(|(_, o)| *o == TaskOutcome::NoData).count();
        let failed = self.outcomes.iter().filter(|(_, o)| matches!(o, TaskOutcome::Failed(_))).count();
        write!(
            f,
            "{} regions: {} exported, {} skipped, {} without data, {} failed",
            self.outcomes.len(),
            self.exported(),
            skipped,
            no_data,
            failed
        )
    }
}

pub(crate) fn build_tasks(config: &RunConfig, columns: Arc<ColumnMap>) -> Vec<Task> {
    config
        .states
        .iter()
        .map(|state| Task {
            region: state.clone(),
            listing_types: config.listing_types.clone(),
            start_date: config.start_date,
            end_date: config.end_date,
            row_cap: config.max_rows,
            output_dir: config.output_dir.clone(),
            output_format: config.output_format,
            overwrite: config.overwrite,
            extra_property_data: config.extra_property_data,
            columns: columns.clone(),
        })
        .collect()
}

/// Skip check, fetch, export, report
pub(crate) async fn process_task(source: &dyn PropertySource, task: &Task) -> TaskOutcome {
    let path = task.target_path();

    let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);

    let outcome = if exists && !task.overwrite {
        TaskOutcome::Skipped(path)
    } else {
        let report = fetch_region(
            source,
            &task.region,
            &task.listing_types,
            task.start_date,
            task.end_date,
            task.row_cap,
            task.extra_property_data,
        )
        .await;

        let failures = report.failures().len();
        if failures > 0 {
            warn!("{} of {} listing types failed for {}", failures, task.listing_types.len(), task.region);
        }

        match report.combine(task.row_cap) {
            Ok(None) => TaskOutcome::NoData,
            Ok(Some(df)) => {
                let columns = task.columns.clone();
                let target = path.clone();
                let format = task.output_format;
                let written =
                    tokio::task::spawn_blocking(move || export::write_export(&df, &columns, &target, format)).await;

                match written {
                    Ok(Ok(rows)) => TaskOutcome::Exported { path, rows },
                    Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
                    Err(e) => TaskOutcome::Failed(format!("export task failed: {}", e)),
                }
            }
            Err(e) => TaskOutcome::Failed(e.to_string()),
        }
    };

    let message = outcome.describe(&task.region);
    match &outcome {
        TaskOutcome::Failed(_) => error!("{}", message),
        _ => info!("{}", message),
    }
    println!("{}", message);

    outcome
}

/// Runs every task, sequentially or on `workers` concurrent workers
pub(crate) async fn run(source: Arc<dyn PropertySource>, tasks: Vec<Task>, workers: usize) -> RunSummary {
    if workers <= 1 {
        let mut summary = RunSummary::default();
        for task in &tasks {
            let outcome = process_task(source.as_ref(), task).await;
            summary.outcomes.push((task.region.clone(), outcome));
        }
        return summary;
    }

    info!("Running {} tasks on {} workers", tasks.len(), workers);

    let (tx, rx) = mpsc::unbounded_channel::<Task>();
    for task in tasks {
        // Receiver is alive until the workers below finish
        let _ = tx.send(task);
    }
    drop(tx);

    let queue = Arc::new(Mutex::new(rx));
    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let queue = queue.clone();
        let source = source.clone();
        pool.spawn(async move {
            let mut done = vec![];
            loop {
                let next = queue.lock().await.recv().await;
                let Some(task) = next else { break };
                let outcome = process_task(source.as_ref(), &task).await;
                done.push((task.region, outcome));
            }
            info!("Worker {} finished {} tasks", worker, done.len());
            done
        });
    }

    let mut summary = RunSummary::default();
    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(mut done) => summary.outcomes.append(&mut done),
            Err(e) => error!("Worker stopped unexpectedly: {}", e),
        }
    }
    summary
}
