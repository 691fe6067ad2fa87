//! Registry and loader for on-chain generative-art primitives.
//!
//! Transformations, conditions, features and particles are compiled into
//! contracts, deployed on an embedded EVM, indexed in memory and persisted
//! as JSON so they can be replayed on the next start.

pub mod codec;
pub mod config;
pub mod core;
pub mod engine;
pub mod loader;
pub mod registry;
pub mod runner;
pub mod types;
pub mod utils;
pub mod virtual_machine;
