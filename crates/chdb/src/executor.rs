//! Pass execution - applies the diff of a reconciliation context

use crate::context::{AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback, RemoteExecutor};
use crate::diff::{Change, ResourceDiff, compute_diffs};
use crate::error::Result;
use crate::reconciler::{ReconcileContext, ReconciledResource, Reconciler};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, VerifyMode};
use rayon::prelude::*;

/// Apply every pending change in `ctx`
///
/// Per-database failures are recorded as [`ApplyResult::Failed`] and do not
/// stop the pass. Errors for which [`crate::Error::is_fatal_for_pass`] holds abort
/// it and are returned. Each outcome is committed to its pairing as soon as
/// its statement returns, so `ctx` reflects what the pass left behind even
/// when it aborts.
///
/// # Arguments
/// * `executor` - Where statements are sent
/// * `ctx` - Pairings from [`Reconciler::prefetch`]
/// * `opts` - Execution options (dry_run, jobs, verify)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
pub fn execute<E, P, C>(
    executor: &E,
    ctx: &mut ReconcileContext,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    E: RemoteExecutor + ?Sized,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = compute_diffs(ctx);
    let mut summary = ExecuteSummary {
        no_change: ctx.len() - diffs.len(),
        ..Default::default()
    };

    if diffs.is_empty() {
        return Ok(summary);
    }

    let reason = if opts.dry_run {
        Some("dry run")
    } else if !confirm.confirm(&format!("Apply {} changes?", diffs.len())) {
        Some("declined")
    } else {
        None
    };
    if let Some(reason) = reason {
        for _ in &diffs {
            summary.add_result(&ApplyResult::Skipped {
                reason: reason.to_string(),
            });
        }
        return Ok(summary);
    }

    // Mutations trust the exit status; verification runs after the commit
    let reconciler = Reconciler::new(executor);
    progress.on_pass_start(diffs.len());

    let pool = if opts.jobs > 1 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(opts.jobs)
            .build()
            .map_err(|e| log::warn!("Thread pool unavailable, applying sequentially: {e}"))
            .ok()
    } else {
        None
    };

    let results: Result<Vec<_>> = match pool {
        // Names are unique within a context, so no two workers touch the
        // same database.
        Some(pool) => pool.install(|| {
            ctx.resources_mut()
                .par_iter_mut()
                .map(|resource| apply_resource(&reconciler, resource, opts.verify))
                .collect()
        }),
        None => ctx
            .resources_mut()
            .iter_mut()
            .map(|resource| apply_resource(&reconciler, resource, opts.verify))
            .collect(),
    };

    let results = match results {
        Ok(results) => results,
        Err(e) => {
            log::error!("Pass aborted: {e}");
            progress.on_pass_complete();
            return Err(e);
        }
    };

    let mut summary = ExecuteSummary::default();
    for (name, result) in &results {
        if *result != ApplyResult::NoChange {
            progress.on_resource_complete(name, result);
        }
        summary.add_result(result);
    }
    progress.on_pass_complete();

    Ok(summary)
}

/// Execute with no progress reporting and automatic confirmation
pub fn execute_simple<E: RemoteExecutor + ?Sized>(
    executor: &E,
    ctx: &mut ReconcileContext,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    execute(executor, ctx, opts, &mut NoProgress, &mut AutoConfirm)
}

/// Apply a single pairing and commit what happened to it
///
/// Only errors fatal for the pass are returned; everything else becomes
/// [`ApplyResult::Failed`].
fn apply_resource<E: RemoteExecutor + ?Sized>(
    reconciler: &Reconciler<'_, E>,
    resource: &mut ReconciledResource,
    verify: VerifyMode,
) -> Result<(String, ApplyResult)> {
    let name = resource.name().to_string();
    let Some(diff) = ResourceDiff::from_resource(resource) else {
        return Ok((name, ApplyResult::NoChange));
    };

    let (outcome, on_success) = match diff.change {
        Change::Create { .. } => (reconciler.create(resource), ApplyResult::Created),
        Change::Destroy => (reconciler.delete(resource), ApplyResult::Removed),
        Change::ChangeEngine { .. } => (reconciler.change_engine(resource), ApplyResult::Modified),
    };

    let mut outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) if e.is_fatal_for_pass() => return Err(e),
        Err(e) => {
            log::warn!("Failed to apply {name}: {e}");
            return Ok((
                name,
                ApplyResult::Failed {
                    error: e.to_string(),
                },
            ));
        }
    };
    resource.commit(&outcome);

    if verify == VerifyMode::Rediscover {
        outcome = reconciler.verify(resource)?;
        resource.commit(&outcome);
    }

    let result = if outcome.succeeded {
        on_success
    } else {
        ApplyResult::Failed {
            error: format!("database {name} did not reach the declared state"),
        }
    };

    Ok((name, result))
}
