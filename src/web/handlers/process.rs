use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::io;
use std::sync::Arc;
use tracing::{error, info};

use crate::pipeline::JobResult;
use crate::storage::sanitize_filename;
use crate::utils::http::HttpError;
use crate::AppContext;

const FILE_FIELD: &str = "file";

pub fn process_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/process", post(process_video))
        .with_state(ctx)
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub result: JobResult,
}

/// Runs a job on the first part carrying a filename. The part is streamed
/// to disk as it arrives; a `file` part without a filename is rejected.
pub async fn process_video(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, HttpError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::new(e.status(), e.body_text()))?
    {
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            if field.name() == Some(FILE_FIELD) {
                return Err(HttpError::bad_request("Uploaded file has no filename"));
            }
            continue;
        };

        let filename = sanitize_filename(&raw_name)
            .ok_or_else(|| HttpError::bad_request("Uploaded file has no usable filename"))?;
        info!("Receiving {}", filename);

        let body = field.map_err(io::Error::other).boxed();
        return match ctx.pipeline.process(&filename, body).await {
            Ok(result) => Ok(Json(ProcessResponse {
                status: "success",
                result,
            })),
            Err(failure) => {
                error!("Processing {} failed: {}", filename, failure);
                Err(HttpError::internal(failure.public_message()))
            }
        };
    }

    Err(HttpError::bad_request("No file part in the request"))
}
