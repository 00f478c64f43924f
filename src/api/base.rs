use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::role::Role;
use crate::runner::JobHandle;
use crate::settings::{APP_NAME, APP_VERSION, JOB_NAME};

pub async fn root(State(job): State<JobHandle>) -> String {
    format!("{} {}: {} node running {}", APP_NAME, APP_VERSION, job.role(), JOB_NAME)
}

pub async fn health() -> &'static str {
    "OK"
}

/// Identity of this process and the job it drives
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AboutResponse {
    pub name: String,
    pub version: String,
    pub job_name: String,
    pub role: Role,
}

#[instrument(skip(job), level = "debug")]
pub async fn about(State(job): State<JobHandle>) -> axum::Json<AboutResponse> {
    axum::Json(AboutResponse {
        name: APP_NAME.to_string(),
        version: APP_VERSION.to_string(),
        job_name: JOB_NAME.to_string(),
        role: job.role(),
    })
}
