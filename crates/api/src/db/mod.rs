//! Shared database schema, migrations, and query builders.
//!
//! Every builder returns a [`Built`] pair of SQL text and bound values for
//! SQLite. The server converts the values into driver params.

pub mod events;
pub mod games;
pub mod libraries;
pub mod loans;
pub mod messages;
pub mod migrations;
pub mod polls;
pub mod sessions;
pub mod tables;
pub mod tournaments;
pub mod trades;
pub mod users;

pub use tables::*;

pub type Built = (String, sea_query::Values);
