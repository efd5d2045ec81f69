pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::AiConversationDescriptor;
pub use model::*;
