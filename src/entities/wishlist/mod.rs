pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::WishlistDescriptor;
pub use model::*;
