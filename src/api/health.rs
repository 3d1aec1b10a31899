use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use tracing::error;

use crate::chain::rpc::RpcClient;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    rpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// General health check including RPC node reachability.
/// Use for load balancers and uptime monitors.
#[get("/health")]
async fn health_check(rpc: web::Data<RpcClient>) -> impl Responder {
    match rpc.get_health().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "healthy".to_string(),
            rpc: "reachable".to_string(),
            error: None,
        }),
        Err(e) => {
            error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unhealthy".to_string(),
                rpc: "unreachable".to_string(),
                error: Some(format!("RPC error: {}", e)),
            })
        }
    }
}

/// Readiness check endpoint
///
/// Returns 503 while the RPC node is unavailable or behind; recovers on its own
/// once the node reports healthy again.
#[get("/ready")]
async fn readiness_check(rpc: web::Data<RpcClient>) -> impl Responder {
    match rpc.get_health().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "ready".to_string(),
            rpc: "reachable".to_string(),
            error: None,
        }),
        Err(e) => {
            error!("Readiness check failed: RPC node unavailable: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "not_ready".to_string(),
                rpc: "unreachable".to_string(),
                error: Some(format!("RPC unavailable: {}", e)),
            })
        }
    }
}

/// Liveness check endpoint
///
/// Simple check that the process is alive. Does not check dependencies.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive".to_string(),
        rpc: "not_checked".to_string(),
        error: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}
