pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::MessageDescriptor;
pub use model::*;
