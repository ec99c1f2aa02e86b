use futures_util::{SinkExt, StreamExt};
use relay_settings::{
    protocol::{Message, Request},
    session::{AfterSave, Session, SessionSettings},
    transport::{DeviceTransport, PushTransport},
};
use reqwest::Url;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{accept_async, tungstenite::Message as Frame};

fn device_config() -> Value {
    json!({
        "command": "configfile",
        "hostname": "shutter-board",
        "adminpwd": "admin",
        "ssid": "home",
        "wifipwd": "secret",
        "relay1": {"type": 0, "pin": 12},
        "relay2": {"type": 0, "pin": 13},
        "relay3": {"type": 0, "pin": 14},
        "relay4": {"type": 0, "pin": 16}
    })
}

// Mock device accepting one WebSocket client
//
// Every text frame the client sends is forwarded to `frames_tx`; the device
// answers `getconf` with a scripted burst and closes on the first `scan`.
async fn start_mock_device(
    ready_tx: oneshot::Sender<SocketAddr>,
    frames_tx: mpsc::UnboundedSender<Value>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let _ = ready_tx.send(listener.local_addr()?);

    let (stream, _) = listener.accept().await?;
    let mut socket = accept_async(stream).await?;

    while let Some(frame) = socket.next().await {
        let Frame::Text(text) = frame? else {
            continue;
        };
        let value: Value = serde_json::from_str(text.as_str())?;
        let command = value["command"].as_str().unwrap_or_default().to_string();
        let _ = frames_tx.send(value);

        match command.as_str() {
            "getconf" => {
                socket
                    .send(Frame::text(json!({"command": "firmware", "progress": 10}).to_string()))
                    .await?;
                socket.send(Frame::text(device_config().to_string())).await?;
                socket
                    .send(Frame::text(json!({"command": "toggle", "id": 1, "state": true}).to_string()))
                    .await?;
                socket
                    .send(Frame::text(
                        json!({
                            "command": "status",
                            "chipid": 42,
                            "cpu": 80,
                            "heap": 20000,
                            "availsize": 500000,
                            "availspiffs": 100,
                            "spiffssize": 1000
                        })
                        .to_string(),
                    ))
                    .await?;
            }
            "scan" => {
                socket.close(None).await?;
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

async fn connect() -> (
    PushTransport,
    mpsc::Receiver<Message>,
    mpsc::UnboundedReceiver<Value>,
    tokio::task::JoinHandle<()>,
) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    let server_handle = tokio::spawn(async move {
        let _ = start_mock_device(ready_tx, frames_tx).await;
    });

    let addr = ready_rx.await.expect("mock device failed to start");
    let url = Url::parse(&format!("ws://{addr}/ws")).expect("invalid mock url");
    let (transport, inbound) = PushTransport::connect(&url)
        .await
        .expect("failed to connect");

    (transport, inbound, frames_rx, server_handle)
}

#[tokio::test]
async fn test_push_requests_configuration_on_open() {
    let (_transport, mut inbound, mut frames, server_handle) = connect().await;

    assert_eq!(frames.recv().await.unwrap(), json!({"command": "getconf"}));

    // the unknown firmware command is skipped
    let first = inbound.recv().await.expect("connection ended early");
    assert!(matches!(first, Message::ConfigFile { config, .. } if config.hostname == "shutter-board"));
    assert!(matches!(inbound.recv().await, Some(Message::Toggle(_))));
    assert!(matches!(inbound.recv().await, Some(Message::Status(_))));

    server_handle.abort();
}

#[tokio::test]
async fn test_push_close_ends_session_run() {
    let (transport, inbound, mut frames, server_handle) = connect().await;
    let mut session = Session::new(
        transport.clone(),
        SessionSettings {
            after_save: AfterSave::Notify,
            ..Default::default()
        },
    );

    // request returns immediately, the reply is pushed
    assert!(transport.request(Request::ScanWifi).await.unwrap().is_none());

    session.run(inbound).await;

    let editable = session.editable().expect("configuration not applied");
    assert_eq!(editable.channels().len(), 4);
    assert!(!editable.layout().wifi_mode);
    assert_eq!(session.monitor().status().unwrap().cpu_mhz, 80);

    assert_eq!(frames.recv().await.unwrap()["command"], "getconf");
    assert_eq!(frames.recv().await.unwrap()["command"], "scan");

    server_handle.abort();
}
