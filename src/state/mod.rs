//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `WorkerState`: what each worker thread is doing (idle, fetching, filtering, extracting, stopped)

mod worker_state;

pub use worker_state::WorkerState;
