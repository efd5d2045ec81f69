//! Core module containing the traits and types shared by every resource

pub mod auth;
pub mod entity;
pub mod error;
pub mod events;
pub mod extractors;
pub mod field;
pub mod locks;
pub mod module;
pub mod query;
pub mod response;
pub mod service;
pub mod store;
pub mod validation;

pub use auth::{AuthContext, AuthPolicy, Role};
pub use entity::{Data, Entity};
pub use error::{DerlgError, DerlgResult};
pub use events::{EventBus, PlatformEvent};
pub use extractors::PathId;
pub use field::FieldValue;
pub use module::Module;
pub use query::{PaginatedResponse, QueryParams};
pub use response::ApiResponse;
pub use service::DataService;
pub use store::QueryableStore;
pub use validation::ValidatedJson;
