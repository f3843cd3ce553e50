//! Three lease-guarded recurring jobs (spec.md §4.I): the matcher, the
//! room-state presence sweep, and the subscription-expiry scan. Each runs
//! on every worker on its own tick; the distributed lease in
//! `driftline_store::LeaseStore` ensures only one worker's tick actually
//! does the work, the rest skip silently.

pub mod matcher;
mod presence_sweep;
mod subscription_expiry;

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{debug, error};

use crate::state::AppState;

const MATCH_TICK: Duration = Duration::from_secs(3);
const MATCH_LEASE_TTL_MS: u64 = 2_000;
const PRESENCE_TICK: Duration = Duration::from_secs(10);
const PRESENCE_LEASE_TTL_MS: u64 = 28_000;
const SUBSCRIPTION_TICK: Duration = Duration::from_secs(60 * 60);
const SUBSCRIPTION_LEASE_TTL_MS: u64 = 50_000;

/// Spawns the three scheduler loops. Called once at boot alongside
/// `fanout::spawn`.
pub fn spawn(state: AppState) {
    tokio::spawn(run_leased("match-job", MATCH_TICK, MATCH_LEASE_TTL_MS, state.clone(), matcher::run_tick));
    tokio::spawn(run_leased(
        "heartbeat-job",
        PRESENCE_TICK,
        PRESENCE_LEASE_TTL_MS,
        state.clone(),
        presence_sweep::run_tick,
    ));
    tokio::spawn(run_leased(
        "subscription-check-job",
        SUBSCRIPTION_TICK,
        SUBSCRIPTION_LEASE_TTL_MS,
        state,
        subscription_expiry::run_tick,
    ));
}

/// Drives one named job on a fixed interval, acquiring its lease before
/// every tick and skipping the tick entirely if another worker holds it
/// (spec.md §4.I, "acquire-or-skip"). Releases the lease after the tick
/// body returns regardless of outcome.
async fn run_leased<F, Fut>(task_name: &'static str, tick: Duration, lease_ttl_ms: u64, state: AppState, body: F)
where
    F: Fn(AppState) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        match state.store.lease.try_acquire(task_name, &state.instance_id, lease_ttl_ms).await {
            Ok(true) => {
                // A panic here must not take the whole loop down with it --
                // the next tick still needs to run (spec.md §7). `catch_unwind`
                // requires the future be `UnwindSafe`; the body only holds
                // cloned, shared state behind locks/pools, so asserting it is
                // safe to resume after a panic is sound.
                if let Err(panic) = AssertUnwindSafe(body(state.clone())).catch_unwind().await {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_owned());
                    error!(task = task_name, panic = %message, "scheduler tick panicked, suppressing");
                }
                if let Err(err) = state.store.lease.release(task_name, &state.instance_id).await {
                    debug!(task = task_name, error = %err, "lease release failed, will expire naturally");
                }
            }
            Ok(false) => debug!(task = task_name, "lease held by another worker, skipping tick"),
            Err(err) => debug!(task = task_name, error = %err, "lease acquisition failed, skipping tick"),
        }
    }
}
