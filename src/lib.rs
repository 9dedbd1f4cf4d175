pub mod config;
pub mod coordinates;
pub mod enrichment;
mod http;
pub mod label;
pub mod registry;
pub mod session;
pub mod source;
pub mod surface;
pub mod task_tracker;
pub mod timeline;
pub mod trace;
