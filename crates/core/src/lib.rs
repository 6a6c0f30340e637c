//! Benchyard domain logic.
//!
//! Everything in this crate is free of database access so it can be unit
//! tested in isolation: run naming rules, parse-tolerant configuration maps,
//! dashboard window synthesis, review comment templates, script archive
//! extraction and the infrastructure provisioner.

pub mod archive;
pub mod comments;
pub mod config_map;
pub mod dashboard;
pub mod error;
pub mod naming;
pub mod provisioning;
pub mod roles;
pub mod run_vars;
pub mod types;
