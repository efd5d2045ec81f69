pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::ReviewDescriptor;
pub use model::*;
