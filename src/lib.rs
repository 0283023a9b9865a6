//! A MySQL tool gateway: a typed adapter between a single MySQL instance
//! and a set of callable "tools" gated by OAuth 2.0 bearer tokens.
//!
//! See `spec.md` and `SPEC_FULL.md` at the repository root for the full
//! design. In short:
//!
//! - [`database`] owns the connection pool, the query executor's
//!   prepared/text dual-mode dispatch, the transaction map, and schema
//!   introspection.
//! - [`auth`] owns RFC 9728/8414 metadata, JWT verification against a
//!   JWKS, and the scope hierarchy that gates tool invocation.
//! - [`tools`] owns the tool registry, input validation, and the dispatch
//!   pipeline that ties the two together.
//! - [`http`] is the thin transport binding those up for a single runnable
//!   binary; [`config`] and [`error`] are the ambient configuration and
//!   error types everything else depends on.

#![allow(clippy::expect_used, reason = "`.expect()` on documented, checked invariants is used throughout (bind_params' \"never fails\" encodings, fixed parse-literal defaults); each call site names the invariant it relies on")]

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod signal;
pub mod telemetry;
pub mod tools;

pub use self::error::{Error, Result};
