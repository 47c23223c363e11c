//! pegsol-cluster - spreading an evaluation over worker processes.
//!
//! The [`Coordinator`] keeps a share of the first jumps for itself and
//! streams the rest to [`WorkerNode`]s over the framing in [`wire`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod wire;
pub mod worker;

pub use config::{ClusterConfig, RetryPolicy, WorkerConfig};
pub use coordinator::{
    assign_slots, expected_result_count, has_more_work, slot_of, Coordinator, RoundPlan,
};
pub use error::{ClusterError, Result};
pub use registry::{connect_with_retry, register_all, register_peer};
pub use wire::{ResultRecord, WorkRecord, DEFAULT_PORT, RESULT_SENTINEL};
pub use worker::{WorkerLink, WorkerNode};
