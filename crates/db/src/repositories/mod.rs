//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod benchmark_repo;
pub mod review_link_repo;
pub mod run_repo;
pub mod secret_repo;

pub use benchmark_repo::BenchmarkRepo;
pub use review_link_repo::ReviewLinkRepo;
pub use run_repo::RunRepo;
pub use secret_repo::SecretRepo;
