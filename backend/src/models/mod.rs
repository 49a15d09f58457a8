pub mod event;
pub mod possession;

pub use event::*;
pub use possession::*;
