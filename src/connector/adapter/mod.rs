mod anthropic_client;
mod lopdf_decoder;
mod mock_completion;
mod mock_decoder;

pub use anthropic_client::*;
pub use lopdf_decoder::*;
pub use mock_completion::*;
pub use mock_decoder::*;
