//! Execution engine - walks the graph and drives resources to terminal state
//!
//! Resources are dispatched as soon as every predecessor is terminal, so
//! independent subgraphs run concurrently on the worker pool while chains
//! execute strictly in order. The retry sleep happens inside a resource's
//! own pool task and never stalls unrelated work. Completion events flow
//! back over a channel to the scheduling loop, which records outcomes,
//! fires notify anchors, and releases newly-ready resources.

use crate::anchor::AnchorBus;
use crate::graph::{Graph, Node};
use crate::resource::Resource;
use crate::runner::CommandRunner;
use crate::types::{
    CommandOutput, ExecuteOptions, ExecutionResult, LogPolicy, RunReport, SkipReason,
};
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// What to do with a resource once all of its predecessors are terminal.
enum Disposition {
    Invoke,
    Skip(SkipReason),
}

/// Run every resource in the graph to a terminal state.
///
/// Returns the per-resource outcomes in declaration order. Execution-time
/// failures are recorded, not returned as `Err`; an `Err` here means the
/// run itself could not proceed (worker pool or channel breakage).
pub fn run(
    graph: &Graph,
    bus: &mut AnchorBus,
    runner: Arc<dyn CommandRunner>,
    opts: &ExecuteOptions,
) -> Result<RunReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| anyhow!("failed to create worker pool: {e}"))?;

    let total = graph.len();
    let (tx, rx) = mpsc::channel::<(usize, ExecutionResult)>();

    let mut results: Vec<Option<ExecutionResult>> = vec![None; total];
    let mut remaining: Vec<usize> = graph
        .nodes()
        .iter()
        .map(|node| node.predecessors.len())
        .collect();
    let mut ready: BTreeSet<usize> = remaining
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count == 0)
        .map(|(index, _)| index)
        .collect();
    let mut in_flight = 0usize;
    let mut settled = 0usize;

    while settled < total {
        // Dispatch everything ready, in declaration order for determinism.
        while let Some(&index) = ready.iter().next() {
            ready.remove(&index);
            let node = &graph.nodes()[index];

            match classify(node, graph, bus, &results)? {
                Disposition::Skip(reason) => {
                    debug!("skipping '{}': {}", node.resource.id, reason.describe());
                    settle(
                        graph,
                        bus,
                        index,
                        ExecutionResult::Skipped { reason },
                        &mut results,
                        &mut remaining,
                        &mut ready,
                        &mut settled,
                    )?;
                }
                Disposition::Invoke => {
                    if opts.verbose {
                        info!("running '{}'", node.resource.id);
                    }
                    in_flight += 1;
                    let resource = node.resource.clone();
                    let runner = Arc::clone(&runner);
                    let tx = tx.clone();
                    pool.spawn(move || {
                        let result = execute_with_retry(&resource, runner.as_ref());
                        // Receiver only drops after every task settles
                        let _ = tx.send((index, result));
                    });
                }
            }
        }

        if settled + in_flight < total && in_flight == 0 {
            break;
        }
        if settled < total {
            let (index, result) = rx
                .recv()
                .context("worker pool disconnected before the run completed")?;
            in_flight -= 1;
            settle(
                graph,
                bus,
                index,
                result,
                &mut results,
                &mut remaining,
                &mut ready,
                &mut settled,
            )?;
        }
    }

    let mut entries = Vec::with_capacity(total);
    for (node, result) in graph.nodes().iter().zip(results) {
        let result = result.ok_or_else(|| {
            anyhow!(
                "resource '{}' never reached a terminal state",
                node.resource.id
            )
        })?;
        entries.push((node.resource.id.clone(), result));
    }
    Ok(RunReport::new(entries))
}

/// Decide whether a resource runs or is skipped, given that every
/// predecessor has already reached a terminal state.
fn classify(
    node: &Node,
    graph: &Graph,
    bus: &AnchorBus,
    results: &[Option<ExecutionResult>],
) -> Result<Disposition> {
    // Failure anywhere in the fan-in of a subscribed anchor poisons the
    // subscriber; an explicit skip upstream does not.
    for anchor in &node.resource.subscribe {
        for notifier in bus.notifiers_of(anchor)? {
            let index = graph
                .index_of(notifier)
                .ok_or_else(|| anyhow!("unregistered notifier '{notifier}'"))?;
            let upstream_failed = match &results[index] {
                Some(result) if result.is_fatal() => true,
                Some(ExecutionResult::Skipped {
                    reason: SkipReason::UpstreamFailed,
                }) => true,
                Some(_) => false,
                None => {
                    return Err(anyhow!(
                        "resource '{}' scheduled before notifier '{notifier}' settled",
                        node.resource.id
                    ));
                }
            };
            if upstream_failed {
                return Ok(Disposition::Skip(SkipReason::UpstreamFailed));
            }
        }
    }

    if node.resource.refresh_only {
        let mut refreshed = false;
        for anchor in &node.resource.subscribe {
            if bus.has_fired(anchor)? {
                refreshed = true;
                break;
            }
        }
        if !refreshed {
            return Ok(Disposition::Skip(SkipReason::NotRefreshed));
        }
    }

    Ok(Disposition::Invoke)
}

/// Record a terminal outcome, fire the notify anchor on success, and
/// release successors whose predecessors are now all terminal.
#[allow(clippy::too_many_arguments)]
fn settle(
    graph: &Graph,
    bus: &mut AnchorBus,
    index: usize,
    result: ExecutionResult,
    results: &mut [Option<ExecutionResult>],
    remaining: &mut [usize],
    ready: &mut BTreeSet<usize>,
    settled: &mut usize,
) -> Result<()> {
    let node = &graph.nodes()[index];
    if result.fires_anchor()
        && let Some(anchor) = &node.resource.notify
    {
        debug!("'{}' fired anchor '{anchor}'", node.resource.id);
        bus.fire(anchor)?;
    }

    results[index] = Some(result);
    *settled += 1;

    for &succ in &node.successors {
        remaining[succ] -= 1;
        if remaining[succ] == 0 {
            ready.insert(succ);
        }
    }
    Ok(())
}

/// Invoke a resource's command under its retry policy.
///
/// The timeout is a hard ceiling measured from the first attempt's start;
/// no new attempt begins once sleeping into it would cross the ceiling.
fn execute_with_retry(resource: &Resource, runner: &dyn CommandRunner) -> ExecutionResult {
    let start = Instant::now();
    let mut last_reason = String::new();
    let mut last_output: Option<CommandOutput> = None;
    let mut timed_out = false;

    for attempt in 1..=resource.retry.tries {
        match runner.run(resource) {
            Ok(output) if output.success => {
                if resource.log_policy == LogPolicy::Always {
                    emit_output(&resource.id, &output);
                }
                return ExecutionResult::Succeeded;
            }
            Ok(output) => {
                last_reason = "command exited with failure".to_string();
                if resource.log_policy == LogPolicy::Always {
                    emit_output(&resource.id, &output);
                }
                last_output = Some(output);
            }
            Err(e) => {
                last_reason = format!("{e:#}");
                last_output = None;
            }
        }

        if attempt == resource.retry.tries {
            break;
        }
        if start.elapsed() + resource.retry.try_sleep >= resource.retry.timeout {
            timed_out = true;
            break;
        }
        warn!(
            "attempt {attempt}/{} of '{}' failed, retrying in {}s",
            resource.retry.tries,
            resource.id,
            resource.retry.try_sleep.as_secs()
        );
        thread::sleep(resource.retry.try_sleep);
    }

    if resource.log_policy == LogPolicy::OnFailure
        && let Some(output) = &last_output
    {
        emit_output(&resource.id, output);
    }

    if timed_out {
        error!(
            "'{}' hit its {}s ceiling without succeeding",
            resource.id,
            resource.retry.timeout.as_secs()
        );
        ExecutionResult::TimedOut
    } else {
        error!("'{}' exhausted all attempts: {last_reason}", resource.id);
        ExecutionResult::Failed {
            reason: last_reason,
        }
    }
}

fn emit_output(id: &str, output: &CommandOutput) {
    let stdout = output.stdout_str();
    if !stdout.trim().is_empty() {
        error!("'{id}' stdout: {}", stdout.trim_end());
    }
    let stderr = output.stderr_str();
    if !stderr.trim().is_empty() {
        error!("'{id}' stderr: {}", stderr.trim_end());
    }
}
