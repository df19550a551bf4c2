//! # repairsync sync protocol
//!
//! Wire-level types shared by the remote client and the sync engine.
//!
//! This crate provides:
//! - [`RemoteRow`]: a flat JSON row as stored by a remote collection
//! - [`RemoteSchema`]: per-kind allow-lists and folded columns, with
//!   [`project`] / [`unproject`] between local records and remote rows
//! - [`Filter`]: equality and greater-than column filters
//!
//! Local records are wider than remote rows, so projection drops columns
//! the remote does not store; unprojection never invents local-only fields.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod filter;
mod row;
mod schema;

pub use filter::{Filter, FilterOp};
pub use row::RemoteRow;
pub use schema::{project, project_patch, schema_for, unproject, Fold, RemoteSchema};
