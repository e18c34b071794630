//! Repository implementations for database operations.

mod group_repo;
mod queue_repo;

pub use group_repo::WorkloadGroupRepository;
pub use queue_repo::QueueRepository;
