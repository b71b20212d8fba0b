//! Health Check Endpoint
//!
//! 프로세스 생존 + 원장 RPC 도달 여부를 함께 보고 ("깊은 헬스체크").
//! 원장에 닿지 않으면 `degraded`로 응답해 트래픽 차단 판단에 사용.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check 응답
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ledger: LedgerStatus,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct LedgerStatus {
    pub reachable: bool,
    pub program_id: String,
    pub latency_ms: Option<u64>,
}

/// GET /health
///
/// 서버 및 원장 상태 확인
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger = state.orchestrator.ledger();

    let started = std::time::Instant::now();
    let ledger_status = match ledger.health().await {
        Ok(_) => LedgerStatus {
            reachable: true,
            program_id: ledger.program_id().to_string(),
            latency_ms: u64::try_from(started.elapsed().as_millis()).ok(),
        },
        Err(err) => {
            tracing::warn!(error = %err, "ledger health check failed");
            LedgerStatus {
                reachable: false,
                program_id: ledger.program_id().to_string(),
                latency_ms: None,
            }
        }
    };

    Json(HealthResponse {
        status: if ledger_status.reachable { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger: ledger_status,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
