//! `GET /health` (spec.md §6): uptime, memory, cpu, approximate total users.

use axum::extract::State;
use axum::Json;
use driftline_protocol::HealthResponse;
use sysinfo::{Pid, System};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut system = System::new();
    let pid = Pid::from_u32(std::process::id());
    system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);

    let (memory_bytes, cpu_percent) = system
        .process(pid)
        .map(|proc| (proc.memory(), proc.cpu_usage()))
        .unwrap_or((0, 0.0));

    let chat_total = state.store.queue.list_available(driftline_protocol::Pool::Chat).await;
    let call_total = state.store.queue.list_available(driftline_protocol::Pool::Call).await;
    let total_users = chat_total.map(|v| v.len()).unwrap_or(0) + call_total.map(|v| v.len()).unwrap_or(0);

    Json(HealthResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        memory_bytes,
        cpu_percent,
        total_users: total_users as u64,
    })
}
