//! Capability tokens for the HTTP boundary.
//!
//! - [`jwt`] -- HS256 token generation and validation.

pub mod jwt;
