//! Transport abstraction: "send a request, maybe get a message back"
//!
//! The HTTP transport answers every read request with the decoded message.
//! The push transport only sends; replies arrive on its inbound channel and
//! go through the same dispatch as HTTP replies.

pub mod http;
pub mod push;

use crate::protocol::{Message, Request};
use anyhow::Result;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use trait_variant::make;

pub use http::HttpTransport;
pub use push::PushTransport;

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait DeviceTransport {
    /// Issue one request; each call is independent and cannot be cancelled
    async fn request(&self, request: Request) -> Result<Option<Message>>;
}
