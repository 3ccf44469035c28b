//! Satellite core: the workflow graph model, the plugin capability traits and
//! the registries that discover and hold plugin instances.
//!
//! Nothing in this crate talks HTTP. The API crate routes requests onto the
//! registries and [`runtime::LocalTaskRuntime`]; the RPC crate implements the
//! collaborator traits in [`remote`].

pub mod backfill;
pub mod catalog;
pub mod error;
pub mod handler;
pub mod process;
pub mod registry;
pub mod remote;
pub mod resource;
pub mod runtime;
pub mod types;

pub use error::{CoreError, CoreResult};
