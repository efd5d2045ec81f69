pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::descriptors;
pub use model::*;
