//! gRPC surface and state mirroring for the thalamus dataflow fabric.

pub mod service;
pub mod state_manager;

pub use service::ThalamusService;
pub use state_manager::StateManager;
