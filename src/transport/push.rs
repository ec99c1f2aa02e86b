use super::DeviceTransport;
use crate::protocol::{DecodeError, Message, Request};
use anyhow::{Context, Result, anyhow};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as Frame};

/// Inbound messages buffered before the reader waits for the session
const INBOUND_CAPACITY: usize = 32;

/// Persistent WebSocket connection to the device
///
/// Replies are not returned from [`DeviceTransport::request`]; they arrive on
/// the receiver handed out by [`PushTransport::connect`]. There is no
/// reconnect: once the connection drops the receiver ends, and requests fail
/// as soon as the writer task has stopped.
#[derive(Clone)]
pub struct PushTransport {
    outbound: mpsc::UnboundedSender<String>,
}

impl PushTransport {
    /// Open the connection and immediately ask for the configuration
    pub async fn connect(url: &Url) -> Result<(Self, mpsc::Receiver<Message>)> {
        info!("connecting push transport to {url}");

        let (stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("failed to connect to {url}"))?;
        let (mut sink, mut source) = stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_CAPACITY);

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                debug!("push send: {frame}");
                if let Err(e) = sink.send(Frame::text(frame)).await {
                    error!("failed to send push frame: {e}");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(Frame::Text(text)) => text,
                    Ok(Frame::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("push connection failed: {e}");
                        break;
                    }
                };

                match Message::decode(text.as_str()) {
                    Ok(message) => {
                        if inbound_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(DecodeError::UnknownCommand(command)) => {
                        debug!("dropping push message with unknown command: {command}")
                    }
                    Err(e) => warn!("dropping push message: {e}"),
                }
            }
            info!("push connection closed");
        });

        let transport = Self { outbound };
        transport.send(&Request::GetConfig)?;

        Ok((transport, inbound))
    }

    fn send(&self, request: &Request) -> Result<()> {
        let frame = request.to_frame().context("failed to encode push frame")?;
        self.outbound
            .send(frame)
            .map_err(|_| anyhow!("push connection closed"))
    }
}

impl DeviceTransport for PushTransport {
    async fn request(&self, request: Request) -> Result<Option<Message>> {
        self.send(&request)?;
        Ok(None)
    }
}
