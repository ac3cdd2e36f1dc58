use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::pipeline::STATIC_PREFIX;
use crate::AppContext;

pub mod process;

pub fn router(ctx: Arc<AppContext>) -> Router {
    let processed_dir = ctx.pipeline.store().processed_dir().to_path_buf();

    Router::new()
        .merge(process::process_router(ctx.clone()))
        .nest_service(STATIC_PREFIX, ServeDir::new(processed_dir))
        .layer(DefaultBodyLimit::max(ctx.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
