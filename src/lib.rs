pub mod config;
pub mod error;
pub mod gemini;
pub mod media;
pub mod normalize;
pub mod pipeline;
pub mod storage;
pub mod utils;
pub mod web;

use std::sync::Arc;

use pipeline::Pipeline;

pub struct AppContext {
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

pub fn init_env() {
    dotenv::dotenv().ok();
}
