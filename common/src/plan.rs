use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::splitter::SplitResult;

pub type PlanId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    /// Pipeline original, con sus catálogos de clusters y particiones.
    pub pipeline: Pipeline,
}

/// Un split ya calculado y guardado por el master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPlanInfo {
    pub id: PlanId,
    /// Nombre del pipeline original
    pub pipeline: String,
    pub submitted_at: DateTime<Utc>,
    pub plan: SplitResult,
}

impl SplitPlanInfo {
    pub fn summary(&self) -> SplitPlanSummary {
        SplitPlanSummary {
            id: self.id.clone(),
            pipeline: self.pipeline.clone(),
            cluster: self.plan.cluster.clone(),
            workers: self.plan.workers.keys().cloned().collect(),
            ports: self.plan.ports.len(),
            submitted_at: self.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPlanSummary {
    pub id: PlanId,
    pub pipeline: String,
    pub cluster: String,
    pub workers: Vec<String>,
    pub ports: usize,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
