pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::RoomDescriptor;
pub use model::*;
