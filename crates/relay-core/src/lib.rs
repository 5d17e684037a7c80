//! # relay-core
//!
//! Shared primitives for the Relay notification service.
//!
//! This crate provides the foundational types used across all Relay
//! components:
//!
//! - **Identifiers**: The strongly-typed [`TaskId`] handle for tasks
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Logging initialization and span constructors
//!
//! ## Crate Boundary
//!
//! `relay-core` is the only crate allowed to define shared primitives.
//! Higher layers (`relay-engine`, `relay-api`) depend on it and never on
//! each other's internals.
//!
//! ## Example
//!
//! ```rust
//! use relay_core::TaskId;
//!
//! let id = TaskId::generate();
//! assert_eq!(id, id.to_string().parse().unwrap());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;

pub use error::{Error, Result};
pub use id::TaskId;
pub use observability::{LogFormat, init_logging};
