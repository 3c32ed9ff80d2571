mod completion;
mod extraction;
mod message;
mod session;

pub use completion::*;
pub use extraction::*;
pub use message::*;
pub use session::*;
