//! # Ledger
//!
//! Everything the committee-voting service knows, behind one SQLite store.
//!
//! - [`auth`]: password hashing, bearer tokens, role gate
//! - [`users`]: the credential store
//! - [`nominations`]: free-text nominations and bulk import
//! - [`ballot`]: per-user selection sets, at most [`ballot::MAX_SELECTIONS`]
//! - [`results`]: grouped people, ranked results, dashboard counts
//!
//! Every function takes the [`Store`] it works against; nothing here holds a
//! global connection.
pub mod auth;
pub mod ballot;
pub mod db;
pub mod error;
pub mod models;
pub mod nominations;
pub mod results;
pub mod users;

pub use auth::Authenticator;
pub use db::Store;
pub use error::{Error, Result};
