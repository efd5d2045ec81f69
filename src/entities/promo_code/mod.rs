pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::PromoCodeDescriptor;
pub use model::*;
