pub mod access;
pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::HotelDescriptor;
pub use model::*;
