//! Koor CRD Definitions
//!
//! Kubernetes Custom Resource Definitions and shared types for the Koor operator.

pub mod koor_cluster;
pub mod quantity;
pub mod schedule;

pub use koor_cluster::*;
pub use quantity::*;
pub use schedule::*;
