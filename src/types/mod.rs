//! Core data model for the analysis pipeline
//!
//! - `sample`: the immutable sample submission and the water parameter vector
//! - `stage`: stage identifiers, tagged stage results and the stage error taxonomy
//! - `outputs`: the value types produced by the six analytic stages
//! - `role`: user roles, the role lookup table and the request-scoped context

mod outputs;
mod role;
mod sample;
mod stage;

pub use outputs::*;
pub use role::*;
pub use sample::*;
pub use stage::*;
