//! HTTP server: module registration, the host and its REST exposure

pub mod builder;
pub mod entity_registry;
pub mod exposure;
pub mod host;
pub mod module;
pub mod rate_limit;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use host::ServerHost;
pub use module::PlatformModule;
