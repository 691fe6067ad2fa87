//! Domain data structures.
//!
//! This module contains the artifacts users register and the messages
//! exchanged with the runner:
//! - `Transformation`, `Condition`, `Feature`, `Particle`: artifact definitions
//! - `*Record`: a definition plus the owner that registered it
//! - `ExecuteRequest`, `Samples`: runner input and output
//! - `errors`: chain and contract error taxonomies

pub mod definitions;
pub mod errors;
pub mod execute;
pub mod records;
