//! Iteration driver
//!
//! Splits the run into fixed-size chunks of consecutive iterations, runs the
//! chunks on a rayon pool (one `Simulation` per chunk) and merges their
//! aggregates in chunk order. Chunk boundaries do not depend on the worker
//! count, so the same request always produces bit-identical output.

use crate::config::CombatConstants;
use crate::error::SimError;
use crate::registry::Registry;
use crate::request::SimRequest;
use crate::result::{Batch, SimResult};
use crate::simulation::Simulation;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Iterations run by one worker task
pub const CHUNK_SIZE: u32 = 50;

/// Partial or final aggregate sent during a run
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub completed: u32,
    pub total: u32,
    pub result: SimResult,
    /// Set on the last update of a run
    pub is_final: bool,
}

/// Optional run-level controls
#[derive(Clone, Default)]
pub struct RunControl {
    /// Raised by the caller to stop between iterations
    pub cancel: Option<Arc<AtomicBool>>,
    pub progress: Option<Sender<ProgressUpdate>>,
    /// Defaults to `CombatConstants::default()`
    pub constants: Option<Arc<CombatConstants>>,
}

/// Run every iteration of `request` and return the aggregates
pub fn run_sim(request: &SimRequest, registry: &Registry) -> Result<SimResult, SimError> {
    run_sim_with(request, registry, &RunControl::default())
}

/// [`run_sim`] with cancellation, progress reporting and custom constants
pub fn run_sim_with(request: &SimRequest, registry: &Registry, control: &RunControl) -> Result<SimResult, SimError> {
    request.validate()?;
    let constants = control
        .constants
        .clone()
        .unwrap_or_else(|| Arc::new(CombatConstants::default()));

    let total = request.options.iterations;
    let chunks = chunk_ranges(total, CHUNK_SIZE);
    let per_wave = match request.options.progress_interval {
        Some(interval) => (interval.div_ceil(CHUNK_SIZE) as usize).max(1),
        None => chunks.len(),
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(request.options.threads)
        .build()
        .map_err(|e| SimError::ThreadPool(e.to_string()))?;

    info!(
        iterations = total,
        seed = request.options.seed,
        workers = pool.current_num_threads(),
        chunks = chunks.len(),
        "starting simulation"
    );

    let cancel = control.cancel.as_deref();
    let mut merged: Option<Batch> = None;

    for wave in chunks.chunks(per_wave) {
        if is_cancelled(cancel) {
            warn!("simulation cancelled");
            break;
        }

        let batches: Vec<Result<Batch, SimError>> = pool.install(|| {
            wave.par_iter()
                .map(|range| run_chunk(request, registry, &constants, range.clone(), cancel))
                .collect()
        });

        for batch in batches {
            let batch = batch?;
            debug!(iterations = batch.iterations, "merging batch");
            match merged.as_mut() {
                Some(m) => m.merge(&batch),
                None => merged = Some(batch),
            }
        }

        if let (Some(progress), Some(m)) = (&control.progress, &merged) {
            if m.iterations < total && !is_cancelled(cancel) {
                // A dropped receiver only means nobody is listening.
                let _ = progress.send(ProgressUpdate {
                    completed: m.iterations,
                    total,
                    result: m.to_result(),
                    is_final: false,
                });
            }
        }
    }

    let result = match merged {
        Some(batch) => batch.to_result(),
        // Cancelled before the first wave; still report the roster.
        None => Simulation::new(request, registry, constants)?.batch().to_result(),
    };

    info!(
        iterations = result.iterations,
        mean_dps = result.raid.mean,
        "simulation finished"
    );

    if let Some(progress) = &control.progress {
        let _ = progress.send(ProgressUpdate {
            completed: result.iterations,
            total,
            result: result.clone(),
            is_final: true,
        });
    }
    Ok(result)
}

fn run_chunk(
    request: &SimRequest,
    registry: &Registry,
    constants: &Arc<CombatConstants>,
    range: Range<u32>,
    cancel: Option<&AtomicBool>,
) -> Result<Batch, SimError> {
    let mut simulation = Simulation::new(request, registry, Arc::clone(constants))?;
    debug!(start = range.start, end = range.end, "running chunk");
    simulation.run(range, cancel);
    Ok(simulation.batch())
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|c| c.load(Ordering::Relaxed))
}

/// Consecutive ranges of at most `size` covering `0..total`
fn chunk_ranges(total: u32, size: u32) -> Vec<Range<u32>> {
    (0..total)
        .step_by(size as usize)
        .map(|start| start..(start + size).min(total))
        .collect()
}
