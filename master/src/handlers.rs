use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use common::{
    split, ErrorResponse, SplitError, SplitPlanInfo, SplitPlanSummary, SplitRequest,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/splits", get(list_splits).post(create_split))
        .route("/api/v1/splits/:id", get(get_split))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: msg.into() }))
}

// Errores de configuración o de particiones son culpa del pipeline enviado;
// un error interno es un bug del splitter.
fn split_status(err: &SplitError) -> StatusCode {
    match err {
        SplitError::Configuration(_) | SplitError::Partitioning(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SplitError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Divide el pipeline recibido y guarda el plan resultante
async fn create_split(
    State(state): State<AppState>,
    Json(req): Json<SplitRequest>,
) -> Result<Json<SplitPlanInfo>, ApiError> {
    let plan = split(&req.pipeline).map_err(|e| {
        warn!("split rechazado para pipeline {}: {}", req.pipeline.name, e);
        api_error(split_status(&e), e.to_string())
    })?;

    let info = SplitPlanInfo {
        id: uuid::Uuid::new_v4().to_string(),
        pipeline: req.pipeline.name,
        submitted_at: Utc::now(),
        plan,
    };

    {
        let mut plans = state
            .plans
            .lock()
            .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "lock plans"))?;
        plans.insert(info.id.clone(), info.clone());
    }

    info!(
        "plan {} creado: pipeline={} cluster={} workers={} puertos={}",
        info.id,
        info.pipeline,
        info.plan.cluster,
        info.plan.workers.len(),
        info.plan.ports.len()
    );

    Ok(Json(info))
}

// Lista resumida de los planes guardados, del más viejo al más nuevo
async fn list_splits(
    State(state): State<AppState>,
) -> Result<Json<Vec<SplitPlanSummary>>, ApiError> {
    let plans = state
        .plans
        .lock()
        .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "lock plans"))?;

    let mut out: Vec<SplitPlanSummary> = plans.values().map(SplitPlanInfo::summary).collect();
    out.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));

    Ok(Json(out))
}

async fn get_split(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SplitPlanInfo>, ApiError> {
    let plans = state
        .plans
        .lock()
        .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "lock plans"))?;

    plans
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("no existe el plan {id}")))
}
