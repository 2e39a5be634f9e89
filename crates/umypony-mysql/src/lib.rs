//! MySQL provider for umypony.
//!
//! Makes a query-only MySQL driver look like a DB-API style connection to
//! an object-relational mapping engine:
//!
//! - [`escape`]: literal escaping through an ordered converter table
//! - [`params`]: `format`-style (`%s`, `%(name)s`) parameter substitution
//! - [`connection`]: the connection/cursor shim over a [`Transport`]
//! - [`transaction`]: foreign-key checks and isolation around sessions
//! - [`inspect`]: `information_schema` existence checks
//! - [`provider`]: dialect metadata and the lifecycle hooks
//!
//! The wire driver itself is supplied by the caller as a [`Transport`].
//!
//! [`Transport`]: umypony_core::Transport

pub mod config;
pub mod connection;
pub mod escape;
pub mod inspect;
pub mod params;
pub mod provider;
pub mod transaction;

#[cfg(test)]
mod test_support;

pub use config::{AdapterConfig, EscapeMode};
pub use connection::{ConnectionState, MySqlConnection};
pub use escape::{Converter, ConverterTable, Escaped, escape};
pub use inspect::QualifiedName;
pub use params::Params;
pub use provider::{ColumnConverter, MySqlProvider, ServerVersion};
