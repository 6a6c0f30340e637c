//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the `Deserialize` DTOs used to create or patch it.

pub mod benchmark;
pub mod review_link;
pub mod run;
pub mod secret;
pub mod status;
