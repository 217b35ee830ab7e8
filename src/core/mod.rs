pub mod catalog;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod model;
pub mod output;
pub mod phase;
