//! # Streaming Client
//!
//! Talks to the relay server: [`RelayClient::stream_message`] streams a chat
//! reply delta by delta, [`RelayClient::generate_image`] fetches one image.
//! Both take a [`CancellationToken`](tokio_util::sync::CancellationToken);
//! cancelling it aborts the HTTP request and resolves the call with whatever
//! was received so far.
//!
//! ```rust,no_run
//! use bach_relay::client::RelayClient;
//! use bach_relay::config::ClientConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> bach_relay::Result<()> {
//! let client = RelayClient::new(&ClientConfig::new("http://localhost:5000/api"))?;
//! let cancel = CancellationToken::new();
//! let reply = client
//!     .stream_message(&[], "hello", &[], "", |delta| print!("{delta}"), &cancel)
//!     .await?;
//! println!("\n{} bytes", reply.len());
//! # Ok(())
//! # }
//! ```

pub mod relay;
pub mod stream;

pub use relay::RelayClient;
pub use stream::consume_stream;
