use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

use crate::error::SyncError;
use crate::role::Role;
use crate::runner::{JobHandle, JobStats};
use crate::schedule::ScheduleSpec;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub role: Role,
    pub schedule: ScheduleSpec,
    pub stats: JobStats,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReconcileResponse {
    pub mutation_occurred: bool,
}

#[instrument(skip(job), level = "debug")]
pub async fn status(State(job): State<JobHandle>) -> axum::Json<StatusResponse> {
    axum::Json(StatusResponse {
        role: job.role(),
        schedule: job.schedule(),
        stats: job.stats().await,
    })
}

#[instrument(skip(job), level = "debug")]
pub async fn schedule(State(job): State<JobHandle>) -> axum::Json<ScheduleSpec> {
    axum::Json(job.schedule())
}

#[instrument(skip(job), level = "debug")]
pub async fn reconcile(
    State(job): State<JobHandle>,
) -> Result<axum::Json<ReconcileResponse>, SyncError> {
    job.trigger()
        .await
        .map_err(|err| {
            event!(
                Level::ERROR,
                message = "Manual reconciliation failed",
                err = format!("{:?}", err)
            );
            err
        })
        .map(|mutation_occurred| axum::Json(ReconcileResponse { mutation_occurred }))
}
