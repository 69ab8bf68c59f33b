pub mod client;
pub mod decode;
pub mod logging;
#[cfg(test)]
pub mod mock_client;
pub mod normalize;
pub mod stream;
pub mod upstream;

pub use client::{ByteStream, RelayClient, RelayResponse};
pub use upstream::{UpstreamResponse, WebhookClient};
