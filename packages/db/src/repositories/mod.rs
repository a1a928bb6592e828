//! Repository implementations for database operations.

mod job_repo;
mod queue_repo;
mod registry_repo;

pub use job_repo::JobRepository;
pub use queue_repo::QueueRepository;
pub use registry_repo::RegistryRepository;
