//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EngineState`: lifecycle phase of a crawl engine (idle, running, draining, done)

mod engine_state;

pub use engine_state::EngineState;
