mod completion_service;
mod document_decoder;

pub use completion_service::*;
pub use document_decoder::*;
