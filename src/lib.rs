//! Resource lifecycle engine for a Snowflake infrastructure provider.
//!
//! The crate turns declared state into Snowflake DDL and reads the remote
//! objects back into state:
//!
//! - [`sdk`]: identifiers, data types, typed statement builders and the
//!   client facade the lifecycles talk to.
//! - [`provider`]: the attribute-map state adapter, diff engine and the
//!   host-facing [`provider::Provider`] registry.
//! - [`resources`]: one lifecycle per managed kind.
//! - [`tracking`]: the operation tag stamped on every outgoing statement.

pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod sdk;
pub mod testing;
pub mod tracking;

pub use error::{ParseError, ProviderError, Result};
pub use provider::{ApplyError, ApplyResult, Provider};
pub use sdk::client::{Client, QueryExecutor, RequestContext};
