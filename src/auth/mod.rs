pub mod callbacks;
pub mod context;
pub mod gate;
pub mod token;

// Re-export so we can do "use crate::auth::*;"
pub use callbacks::Callbacks;
pub use context::RequestContext;
pub use gate::StagingGate;
