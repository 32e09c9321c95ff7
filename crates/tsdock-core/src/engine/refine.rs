use super::context::EmbedContext;
use super::error::EngineError;
use super::pose::Pose;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::element::Element;
use nalgebra::Point3;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Why a single refinement (or transition-state search) produced no structure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RefinementFailure {
    #[error("optimization did not converge")]
    NotConverged,

    #[error("optimization exceeded the time limit of {0:?}")]
    Timeout(Duration),

    #[error("optimization was cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),
}

/// Cooperative stop signal shared with a running backend call.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Target distance between two atoms, by index in the request's coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceConstraint {
    pub first: usize,
    pub second: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementRequest {
    pub index: usize,
    pub elements: Vec<Element>,
    pub coordinates: Vec<Point3<f64>>,
    pub theory_level: String,
    /// Forming bonds at their unscaled target distances.
    pub constraints: Vec<DistanceConstraint>,
}

impl RefinementRequest {
    pub fn from_pose(ctx: &EmbedContext, pose: &Pose, index: usize) -> Self {
        let constraints = ctx
            .pairing(pose.provenance().pairing)
            .map(|pairing| {
                pairing
                    .pairs
                    .iter()
                    .map(|pair| DistanceConstraint {
                        first: ctx.global_index(pair.donor),
                        second: ctx.global_index(pair.acceptor),
                        distance: pair.distance,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            index,
            elements: ctx.elements().to_vec(),
            coordinates: pose.coordinates(ctx),
            theory_level: ctx.config.refinement.theory_level.clone(),
            constraints,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutcome {
    pub coordinates: Vec<Point3<f64>>,
    /// Final energy in kcal/mol, when the backend reports one.
    pub energy: Option<f64>,
}

/// External geometry optimizer.
///
/// Calls run on blocking threads and may take arbitrarily long; a backend
/// should poll `cancel` and return [`RefinementFailure::Cancelled`] once it is set.
/// A call occupies one worker slot until it returns, even after a timeout.
pub trait Refiner: Send + Sync + 'static {
    fn refine(
        &self,
        request: &RefinementRequest,
        cancel: &CancellationFlag,
    ) -> Result<RefinementOutcome, RefinementFailure>;
}

/// A pose together with the geometry the refinement stage settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedStructure {
    pub pose: Pose,
    pub coordinates: Vec<Point3<f64>>,
    pub energy: Option<f64>,
    pub failure: Option<RefinementFailure>,
}

impl RefinedStructure {
    pub fn is_refined(&self) -> bool {
        self.failure.is_none()
    }
}

/// Concurrency limits for calls to external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub workers: usize,
    pub timeout: Option<Duration>,
}

/// Runs `work` on every job with at most `limits.workers` calls in flight.
///
/// Each call executes on a blocking thread and holds its worker slot until
/// it returns. When a call outlives the timeout its cancellation flag is
/// raised and the job is reported as [`RefinementFailure::Timeout`]; a
/// backend that ignores the flag keeps its slot until it finishes. Results
/// keep job order.
pub async fn run_bounded<J, T, F>(
    jobs: Vec<J>,
    limits: PoolLimits,
    reporter: &ProgressReporter<'_>,
    work: F,
) -> Result<Vec<Result<T, RefinementFailure>>, EngineError>
where
    J: Send + 'static,
    T: Send + 'static,
    F: Fn(J, &CancellationFlag) -> Result<T, RefinementFailure> + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limits.workers.max(1)));
    let work = Arc::new(work);
    reporter.report(Progress::TaskStart {
        total_steps: jobs.len() as u64,
    });

    let handles: Vec<_> = jobs
        .into_iter()
        .map(|job| {
            let semaphore = Arc::clone(&semaphore);
            let work = Arc::clone(&work);
            tokio::spawn(async move {
                let permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| EngineError::Refinement(e.to_string()))?;
                let flag = CancellationFlag::new();
                let call_flag = flag.clone();
                let call = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    work(job, &call_flag)
                });

                let joined = match limits.timeout {
                    Some(limit) => match tokio::time::timeout(limit, call).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            flag.cancel();
                            return Ok(Err(RefinementFailure::Timeout(limit)));
                        }
                    },
                    None => call.await,
                };
                Ok::<_, EngineError>(
                    joined.unwrap_or_else(|e| Err(RefinementFailure::Backend(e.to_string()))),
                )
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| EngineError::Refinement(e.to_string()))??;
        reporter.report(Progress::TaskIncrement);
        results.push(outcome);
    }
    reporter.report(Progress::TaskFinish);
    Ok(results)
}

/// Refines every pose through `refiner`.
///
/// Failures are logged and returned alongside the original geometry so the
/// caller can apply its retention policy.
pub async fn refine_poses(
    ctx: &EmbedContext<'_>,
    poses: Vec<Pose>,
    refiner: Arc<dyn Refiner>,
) -> Result<Vec<RefinedStructure>, EngineError> {
    let requests: Vec<RefinementRequest> = poses
        .iter()
        .enumerate()
        .map(|(index, pose)| RefinementRequest::from_pose(ctx, pose, index))
        .collect();
    let limits = PoolLimits {
        workers: ctx.config.refinement.workers,
        timeout: ctx.config.refinement.timeout,
    };
    debug!(requests = requests.len(), workers = limits.workers, "Dispatching refinement requests.");

    let originals: Vec<Vec<Point3<f64>>> = requests.iter().map(|r| r.coordinates.clone()).collect();
    let outcomes = run_bounded(requests, limits, ctx.reporter, move |request, cancel| {
        refiner.refine(&request, cancel)
    })
    .await?;
    if outcomes.len() != poses.len() {
        return Err(EngineError::Internal(format!(
            "refinement pool returned {} outcomes for {} poses",
            outcomes.len(),
            poses.len()
        )));
    }

    let expected = ctx.total_atoms();
    Ok(poses
        .into_iter()
        .zip(originals)
        .zip(outcomes)
        .enumerate()
        .map(|(index, ((pose, original), outcome))| {
            let outcome = outcome.and_then(|refined| {
                if refined.coordinates.len() == expected {
                    Ok(refined)
                } else {
                    Err(RefinementFailure::Backend(format!(
                        "returned {} atoms, expected {}",
                        refined.coordinates.len(),
                        expected
                    )))
                }
            });
            match outcome {
                Ok(refined) => RefinedStructure {
                    pose,
                    coordinates: refined.coordinates,
                    energy: refined.energy,
                    failure: None,
                },
                Err(failure) => {
                    warn!(index, %failure, "Refinement failed.");
                    RefinedStructure {
                        pose,
                        coordinates: original,
                        energy: None,
                        failure: Some(failure),
                    }
                }
            }
        })
        .collect())
}
