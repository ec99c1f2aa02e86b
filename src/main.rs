use anyhow::{Context, Result, bail};
use env_logger::{Builder, Env, Target};
use log::{debug, error, info, warn};
use relay_settings::{
    backup::BackupCodec,
    config::{AppConfig, TransportKind},
    session::{Notification, Session, SessionSettings},
    status::Gauge,
    transport::{DeviceTransport, HttpTransport, PushTransport},
};
use std::io::Write;
use tokio::sync::broadcast::{Receiver, error::RecvError};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize();

    let config = AppConfig::get();
    let settings = SessionSettings::from(config);

    match config.device.transport {
        TransportKind::Http => {
            let transport = HttpTransport::new(config.device.http_url.clone())
                .context("failed to create http transport")?;
            let mut session = Session::new(transport, settings);
            let reporter = tokio::spawn(report(session.subscribe()));

            session.load().await.context("failed to load configuration")?;
            synchronize(&mut session, config).await?;

            drop(session);
            let _ = reporter.await;
            Ok(())
        }
        TransportKind::Push => {
            let (transport, mut inbound) = PushTransport::connect(&config.device.push_url).await?;
            let mut session = Session::new(transport, settings);
            let reporter = tokio::spawn(report(session.subscribe()));

            // the configuration was requested on connect
            while session.store().config().is_none() {
                let Some(message) = inbound.recv().await else {
                    bail!("connection closed before the configuration arrived");
                };
                session.handle(message).await?;
            }
            synchronize(&mut session, config).await?;

            tokio::select! {
                _ = tokio::signal::ctrl_c() => debug!("ctrl-c"),
                _ = session.run(inbound) => {},
            }

            drop(session);
            let _ = reporter.await;
            Ok(())
        }
    }
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));
}

/// Backup and restore as configured, after the configuration is loaded
async fn synchronize<T: DeviceTransport>(session: &mut Session<T>, config: &AppConfig) -> Result<()> {
    session
        .refresh_status()
        .await
        .context("failed to refresh status")?;

    if let Some(dir) = &config.paths.backup_dir {
        session
            .export_backup()?
            .write_to(dir)
            .context("failed to write backup")?;
    }

    if let Some(file) = &config.paths.restore_file {
        let pending = BackupCodec::import_path(file)
            .with_context(|| format!("failed to read backup {}", file.display()))?;

        if config.paths.restore_confirmed {
            session
                .restore(pending.confirm())
                .await
                .context("failed to restore backup")?;
        } else {
            warn!("restore of {} skipped: set RESTORE_CONFIRM=yes", file.display());
            pending.discard();
        }
    }

    Ok(())
}

async fn report(mut notifications: Receiver<Notification>) {
    loop {
        match notifications.recv().await {
            Ok(Notification::StatusUpdated(gauges)) => info!(
                "heap {}, flash {}, filesystem {}",
                describe(&gauges.heap),
                describe(&gauges.flash),
                describe(&gauges.filesystem)
            ),
            Ok(Notification::ConfigLoaded(config)) => info!(
                "{}: {} channels, {} shutters, {:?} mode",
                config.hostname,
                config.channels().len(),
                config.shutters().len(),
                config.network.mode()
            ),
            Ok(Notification::Toggle(fields)) => info!("toggle: {}", serde_json::Value::Object(fields)),
            Ok(Notification::Saved) => info!("configuration saved"),
            Ok(other) => debug!("{other:?}"),
            Err(RecvError::Lagged(missed)) => warn!("missed {missed} notifications"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn describe(gauge: &Gauge) -> String {
    format!("{:.1}% free ({:?})", gauge.percent, gauge.severity)
}
