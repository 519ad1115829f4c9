// src/worker/mod.rs — Demo worker endpoint speaking the run_task contract

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

/// Shared state for worker handlers.
#[derive(Clone)]
pub struct WorkerState {
    pub name: String,
    pub balance: Arc<Mutex<f64>>,
}

impl WorkerState {
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        Self {
            name: name.into(),
            balance: Arc::new(Mutex::new(balance)),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance.lock().map(|b| *b).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunTaskBody {
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub name: String,
    pub balance: f64,
}

/// Build the axum router for a worker.
pub fn build_router(state: WorkerState) -> Router {
    Router::new()
        .route("/run_task", post(run_task))
        .route("/identity", get(identity))
        .with_state(state)
}

/// POST /run_task — accept while solvent, credit the offered price.
pub async fn run_task(
    State(state): State<WorkerState>,
    Json(body): Json<RunTaskBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(mut balance) = state.balance.lock() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"status": "error"})),
        );
    };

    if *balance < 0.0 {
        tracing::info!(worker = %state.name, balance = *balance, "Rejected task");
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"status": "rejected"})),
        );
    }

    *balance += body.price;
    tracing::info!(
        worker = %state.name,
        sender = body.sender.as_deref().unwrap_or("unknown"),
        price = body.price,
        "Completed task: {}",
        body.description
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "completed",
            "agent": state.name,
            "description": body.description,
            "price": body.price,
        })),
    )
}

/// GET /identity
pub async fn identity(State(state): State<WorkerState>) -> Json<Identity> {
    Json(Identity {
        name: state.name.clone(),
        balance: state.balance(),
    })
}

/// Serve a worker on 127.0.0.1:`port` until Ctrl+C.
pub async fn serve(name: &str, port: u16, balance: f64) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{port}");
    let router = build_router(WorkerState::new(name, balance));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Worker {name} listening on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn run_task_request(price: f64) -> Request<Body> {
        let body = serde_json::json!({
            "description": "Analyze data patterns",
            "price": price,
            "sender": "AutonomousController",
        });
        Request::builder()
            .method("POST")
            .uri("/run_task")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_task_completes_and_credits() {
        let state = WorkerState::new("AgentA", 10.0);
        let app = build_router(state.clone());

        let resp = app.oneshot(run_task_request(25.0)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "completed");
        assert_eq!(json["agent"], "AgentA");
        assert_eq!(json["price"], 25.0);
        assert_eq!(state.balance(), 35.0);
    }

    #[tokio::test]
    async fn test_insolvent_worker_rejects() {
        let state = WorkerState::new("AgentB", -1.0);
        let app = build_router(state.clone());

        let resp = app.oneshot(run_task_request(5.0)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["status"], "rejected");
        assert_eq!(state.balance(), -1.0);
    }

    #[tokio::test]
    async fn test_identity() {
        let app = build_router(WorkerState::new("AgentC", 3.5));
        let req = Request::builder()
            .uri("/identity")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["name"], "AgentC");
        assert_eq!(json["balance"], 3.5);
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let app = build_router(WorkerState::new("AgentA", 0.0));
        let req = Request::builder()
            .method("POST")
            .uri("/run_task")
            .header("content-type", "application/json")
            .body(Body::from("{\"price\": \"free\"}"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }
}
