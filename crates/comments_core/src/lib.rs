//! comments_core: the permission-and-history engine behind the group comments service.
//!
//! - [`policy`] decides who may read or change a comment.
//! - [`ledger`] records every content change as an immutable history entry.
//! - [`service`] runs the comment lifecycle on top of both, against the
//!   storage traits in [`ports`].
//!
//! Transport adapters live in `comments_server`; Postgres lives in `comments_postgres`.

pub mod error;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod policy;
pub mod ports;
pub mod service;
pub mod types;
