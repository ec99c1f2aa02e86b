//! One configuration session against one device
//!
//! The session owns the transport and all client-side state. Replies returned
//! by the transport and messages pushed by the device go through the same
//! [`Session::handle`] dispatch; observers learn about changes through the
//! [`Notification`] broadcast.

use crate::{
    Error, Result,
    backup::{BackupCodec, BackupFile, ConfirmedRestore},
    config::AppConfig,
    protocol::{Message, Request},
    reconcile::{EditableConfig, reconcile},
    scan::{ScanController, ScanPolicy, ScanState, ScanStep},
    status::{Capacities, Gauges, StatusMonitor},
    store::ConfigStore,
    transport::DeviceTransport,
    types::{DeviceStatus, Network, WifiMode},
};
use log::{debug, error, info};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::{
    sync::{broadcast, mpsc},
    time::{Instant, sleep_until},
};

const NOTIFICATION_CAPACITY: usize = 64;

/// What happens after the device accepted a configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AfterSave {
    /// Wait for the device to apply it, drop all state and load again
    Reload { delay: Duration },
    /// Keep the state and emit [`Notification::Saved`]
    Notify,
}

impl Default for AfterSave {
    fn default() -> Self {
        Self::Reload {
            delay: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub after_save: AfterSave,
    pub scan: ScanPolicy,
    pub capacities: Capacities,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            after_save: config.after_save,
            scan: config.scan,
            capacities: config.capacities,
        }
    }
}

/// State changes published to the renderer
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    ConfigLoaded(EditableConfig),
    StatusUpdated(Gauges),
    ScanUpdated(ScanState),
    /// Raw fields of a `toggle` push
    Toggle(Map<String, Value>),
    Saved,
    Reloading { delay: Duration },
}

pub struct Session<T> {
    transport: T,
    settings: SessionSettings,
    store: ConfigStore,
    scan: ScanController,
    monitor: StatusMonitor,
    editable: Option<EditableConfig>,
    notifications: broadcast::Sender<Notification>,
    /// When the next pushed scan request is due
    scan_retry: Option<Instant>,
}

impl<T: DeviceTransport> Session<T> {
    pub fn new(transport: T, settings: SessionSettings) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            transport,
            settings,
            store: ConfigStore::default(),
            scan: ScanController::new(settings.scan),
            monitor: StatusMonitor::new(settings.capacities),
            editable: None,
            notifications,
            scan_retry: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn scan(&self) -> &ScanController {
        &self.scan
    }

    pub fn monitor(&self) -> &StatusMonitor {
        &self.monitor
    }

    pub fn editable(&self) -> Option<&EditableConfig> {
        self.editable.as_ref()
    }

    pub fn editable_mut(&mut self) -> Option<&mut EditableConfig> {
        self.editable.as_mut()
    }

    /// Request the configuration; over push the reply arrives through [`Session::run`]
    pub async fn load(&mut self) -> Result<()> {
        if self.store.load(&self.transport).await?.is_some() {
            self.config_applied();
        }
        Ok(())
    }

    pub async fn refresh_status(&mut self) -> Result<()> {
        let reply = self
            .transport
            .request(Request::Status)
            .await
            .map_err(Error::Transport)?;

        match reply {
            Some(message) => self.handle(message).await,
            None => Ok(()),
        }
    }

    /// Start a new WiFi scan cycle
    ///
    /// With a replying transport this returns once the cycle finished; with
    /// push it returns after the first request and the cycle continues in
    /// [`Session::run`] as `ssidlist` messages arrive.
    pub async fn start_scan(&mut self) -> Result<()> {
        self.scan_retry = None;
        let step = self.scan.trigger();
        self.scan_updated();
        self.drive_scan(step).await
    }

    /// Select a scanned network and copy it into the form
    pub fn select_network(&mut self, index: usize) -> Option<Network> {
        let selected = self.scan.select(index)?.clone();
        if let Some(editable) = &mut self.editable {
            editable.select_network(&selected);
        }
        Some(selected)
    }

    pub fn set_wifi_mode(&mut self, mode: WifiMode) -> Result<()> {
        let editable = self.editable.as_mut().ok_or(Error::NotLoaded)?;
        editable.set_mode(mode, self.scan.selection());
        Ok(())
    }

    /// Submit the edited form as a full replacement
    pub async fn save(&mut self) -> Result<()> {
        let config = self.editable.as_ref().ok_or(Error::NotLoaded)?.to_config();
        self.store.save(&self.transport, &config).await?;
        self.after_save().await
    }

    pub fn export_backup(&self) -> Result<BackupFile> {
        BackupCodec::export(self.store.raw().ok_or(Error::NotLoaded)?)
    }

    pub async fn restore(&mut self, restore: ConfirmedRestore) -> Result<()> {
        self.store.restore(&self.transport, restore).await?;
        self.after_save().await
    }

    /// Deadline of a scan retry scheduled by a pushed `ssidlist`
    pub fn pending_scan_retry(&self) -> Option<Instant> {
        self.scan_retry
    }

    /// Apply one device message
    ///
    /// Never waits: a scan retry requested by a pushed `ssidlist` is only
    /// scheduled and sent by [`Session::run`] once its backoff elapsed.
    pub async fn handle(&mut self, message: Message) -> Result<()> {
        debug!("handling {} message", message.command());

        match message {
            Message::SsidList(result) => {
                let step = self.scan.on_response(result);
                self.scan_updated();
                self.scan_retry = match step {
                    ScanStep::Request { delay } => Some(Instant::now() + delay),
                    ScanStep::Done => None,
                };
            }
            Message::ConfigFile { raw, config } => {
                self.store.apply(raw, config);
                self.config_applied();
            }
            Message::Status(status) => self.status_received(status),
            Message::Toggle(fields) => self.notify(Notification::Toggle(fields)),
        }
        Ok(())
    }

    /// Apply pushed messages and send due scan retries until the connection ends
    pub async fn run(&mut self, mut inbound: mpsc::Receiver<Message>) {
        loop {
            let retry = self.scan_retry;

            tokio::select! {
                message = inbound.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    if let Err(e) = self.handle(message).await {
                        error!("failed to handle device message: {e}");
                    }
                }
                _ = sleep_until(retry.unwrap_or_else(Instant::now)), if retry.is_some() => {
                    self.scan_retry = None;
                    if let Err(e) = self.retry_scan().await {
                        error!("failed to request scan: {e}");
                    }
                }
            }
        }
        info!("device connection ended");
    }

    async fn retry_scan(&mut self) -> Result<()> {
        if !self.scan.is_scanning() {
            return Ok(());
        }
        self.drive_scan(ScanStep::Request {
            delay: Duration::ZERO,
        })
        .await
    }

    async fn drive_scan(&mut self, mut step: ScanStep) -> Result<()> {
        while let ScanStep::Request { delay } = step {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let reply = self
                .transport
                .request(Request::ScanWifi)
                .await
                .map_err(Error::Transport)?;

            step = match reply {
                Some(Message::SsidList(result)) => self.scan.on_response(result),
                Some(other) => {
                    return Err(Error::Parse(format!(
                        "unexpected {} reply to scan request",
                        other.command()
                    )));
                }
                // reply is pushed later
                None => return Ok(()),
            };
            self.scan_updated();
        }
        Ok(())
    }

    async fn after_save(&mut self) -> Result<()> {
        match self.settings.after_save {
            AfterSave::Notify => {
                self.notify(Notification::Saved);
                Ok(())
            }
            AfterSave::Reload { delay } => {
                info!("reloading configuration in {delay:?}");
                self.notify(Notification::Reloading { delay });
                tokio::time::sleep(delay).await;

                self.reset();
                self.load().await
            }
        }
    }

    fn config_applied(&mut self) {
        let Some(config) = self.store.config() else {
            return;
        };
        let editable = reconcile(config, self.scan.selection());

        // the device echoes its status in the configuration
        if let Some(status) = self
            .store
            .raw()
            .and_then(|raw| DeviceStatus::deserialize(raw).ok())
        {
            self.status_received(status);
        }

        self.editable = Some(editable.clone());
        self.notify(Notification::ConfigLoaded(editable));
    }

    fn status_received(&mut self, status: DeviceStatus) {
        let gauges = self.monitor.update(status).clone();
        self.notify(Notification::StatusUpdated(gauges));
    }

    fn scan_updated(&self) {
        self.notify(Notification::ScanUpdated(self.scan.state().clone()));
    }

    fn reset(&mut self) {
        self.scan_retry = None;
        self.store.clear();
        self.scan.reset();
        self.monitor.clear();
        self.editable = None;
    }

    fn notify(&self, notification: Notification) {
        // no subscriber is fine
        let _ = self.notifications.send(notification);
    }
}
