//! Correspondence containers shared by the pose solvers.

mod correspondence;

pub use correspondence::*;
