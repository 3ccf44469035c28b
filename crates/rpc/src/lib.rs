//! HTTP clients for the orchestrator-side collaborators: the resource
//! database and the human task system.

pub mod endpoint;
pub mod error;
pub mod hts;
pub mod resource_db;

pub use endpoint::CoreEndpoint;
pub use error::RpcError;
pub use hts::RpcHumanTaskSystem;
pub use resource_db::RpcResourceDb;
