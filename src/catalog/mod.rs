pub mod llama_client;
pub mod normalize;
pub mod source;
pub mod types;

pub use llama_client::{LlamaClientError, LlamaYieldsClient};
pub use normalize::normalize;
pub use source::{PoolSource, SharedPoolSource, StaticPoolSource};
pub use types::{PoolsResponse, RawPool};
