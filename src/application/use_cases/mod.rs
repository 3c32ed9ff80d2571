mod chat_session;
mod extract_document;

pub use chat_session::*;
pub use extract_document::*;
