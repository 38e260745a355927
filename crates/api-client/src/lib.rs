pub mod client;
pub mod error;
pub mod retry;

pub use client::ApiClient;
pub use error::ClientError;
pub use gametaverns_api;
pub use retry::RetryConfig;
