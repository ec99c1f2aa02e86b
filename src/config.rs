use crate::{scan::ScanPolicy, session::AfterSave, status::Capacities};
use anyhow::{Context, Result, bail};
use reqwest::Url;
use std::{env, path::PathBuf, str::FromStr, sync::OnceLock, time::Duration};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// How to reach the device
    pub device: DeviceConnectionConfig,

    /// What happens after a successful save
    pub after_save: AfterSave,

    /// WiFi scan retry policy
    pub scan: ScanPolicy,

    /// Fixed capacities of the firmware build
    pub capacities: Capacities,

    /// Backup/restore file locations used by the binary
    pub paths: PathConfig,
}

/// Transport used to talk to the device
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportKind {
    #[default]
    Http,
    Push,
}

impl FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "push" | "ws" | "websocket" => Ok(Self::Push),
            other => bail!("unknown transport: {other}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeviceConnectionConfig {
    pub transport: TransportKind,
    pub http_url: Url,
    pub push_url: Url,
}

#[derive(Clone, Debug, Default)]
pub struct PathConfig {
    pub backup_dir: Option<PathBuf>,
    pub restore_file: Option<PathBuf>,
    pub restore_confirmed: bool,
}

impl AppConfig {
    /// Get or load the application configuration
    ///
    /// Returns a reference to the cached configuration. On first call, it loads
    /// and validates all configuration from environment variables.
    ///
    /// # Panics
    /// Panics if configuration loading fails. The binary cannot do anything
    /// useful without a valid device address.
    pub fn get() -> &'static Self {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        APP_CONFIG.get_or_init(|| {
            Self::from_env().expect("failed to load application configuration")
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load the configuration from an arbitrary variable source
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let device = DeviceConnectionConfig::load(&lookup)?;
        let after_save = load_after_save(&lookup)?;

        let scan = ScanPolicy {
            max_attempts: parse_var(&lookup, "SCAN_MAX_ATTEMPTS", 10)?,
            initial_backoff: Duration::from_millis(parse_var(&lookup, "SCAN_BACKOFF_MS", 500)?),
            max_backoff: Duration::from_millis(parse_var(&lookup, "SCAN_MAX_BACKOFF_MS", 5000)?),
        };
        anyhow::ensure!(
            scan.max_attempts > 0,
            "failed to load SCAN_MAX_ATTEMPTS: must be at least 1"
        );

        let capacities = Capacities {
            heap_bytes_total: parse_var(&lookup, "HEAP_TOTAL_BYTES", Capacities::DEFAULT_HEAP)?,
            flash_bytes_total: parse_var(&lookup, "FLASH_TOTAL_BYTES", Capacities::DEFAULT_FLASH)?,
        };

        let paths = PathConfig {
            backup_dir: lookup("BACKUP_DIR").map(PathBuf::from),
            restore_file: lookup("RESTORE_FILE").map(PathBuf::from),
            restore_confirmed: lookup("RESTORE_CONFIRM").is_some_and(|v| v == "yes"),
        };

        Ok(Self {
            device,
            after_save,
            scan,
            capacities,
            paths,
        })
    }
}

impl DeviceConnectionConfig {
    const DEFAULT_URL: &str = "http://192.168.4.1/";

    fn load(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let transport = match lookup("DEVICE_TRANSPORT") {
            Some(kind) => kind.parse().context("failed to parse DEVICE_TRANSPORT")?,
            None => TransportKind::default(),
        };

        let mut http_url = lookup("DEVICE_URL").unwrap_or_else(|| Self::DEFAULT_URL.to_string());
        // relative endpoints are joined onto the base
        if !http_url.ends_with('/') {
            http_url.push('/');
        }
        let http_url = Url::parse(&http_url).context("failed to parse DEVICE_URL")?;

        let push_url = match lookup("DEVICE_PUSH_URL") {
            Some(url) => Url::parse(&url).context("failed to parse DEVICE_PUSH_URL")?,
            None => Self::derive_push_url(&http_url)?,
        };

        Ok(Self {
            transport,
            http_url,
            push_url,
        })
    }

    fn derive_push_url(http_url: &Url) -> Result<Url> {
        let mut url = http_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        if url.set_scheme(scheme).is_err() {
            bail!("failed to derive push url from {http_url}");
        }
        url.join("ws").context("failed to derive push url")
    }
}

fn load_after_save(lookup: &impl Fn(&str) -> Option<String>) -> Result<AfterSave> {
    let delay = Duration::from_secs(parse_var(lookup, "RELOAD_DELAY_SECS", 10)?);

    match lookup("AFTER_SAVE").as_deref() {
        None | Some("reload") => Ok(AfterSave::Reload { delay }),
        Some("notify") => Ok(AfterSave::Notify),
        Some(other) => bail!("failed to parse AFTER_SAVE: unknown value {other}"),
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("failed to parse {key}: invalid format")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();

        assert_eq!(config.device.transport, TransportKind::Http);
        assert_eq!(config.device.http_url.as_str(), "http://192.168.4.1/");
        assert_eq!(config.device.push_url.as_str(), "ws://192.168.4.1/ws");
        assert_eq!(
            config.after_save,
            AfterSave::Reload {
                delay: Duration::from_secs(10)
            }
        );
        assert_eq!(config.scan.max_attempts, 10);
        assert_eq!(config.capacities.heap_bytes_total, 81920);
        assert_eq!(config.capacities.flash_bytes_total, 1044464);
        assert!(config.paths.backup_dir.is_none());
    }

    #[test]
    fn derives_secure_push_url() {
        let config = load(&[("DEVICE_URL", "https://relay.local/ui")]).unwrap();

        assert_eq!(config.device.http_url.as_str(), "https://relay.local/ui/");
        assert_eq!(config.device.push_url.as_str(), "wss://relay.local/ui/ws");
    }

    #[test]
    fn reads_explicit_settings() {
        let config = load(&[
            ("DEVICE_TRANSPORT", "push"),
            ("DEVICE_PUSH_URL", "ws://10.0.0.2:81/"),
            ("AFTER_SAVE", "notify"),
            ("SCAN_MAX_ATTEMPTS", "3"),
            ("HEAP_TOTAL_BYTES", "50000"),
            ("RESTORE_FILE", "/tmp/relay-settings.json"),
            ("RESTORE_CONFIRM", "yes"),
        ])
        .unwrap();

        assert_eq!(config.device.transport, TransportKind::Push);
        assert_eq!(config.device.push_url.as_str(), "ws://10.0.0.2:81/");
        assert_eq!(config.after_save, AfterSave::Notify);
        assert_eq!(config.scan.max_attempts, 3);
        assert_eq!(config.capacities.heap_bytes_total, 50000);
        assert!(config.paths.restore_confirmed);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(load(&[("DEVICE_TRANSPORT", "carrier-pigeon")]).is_err());
        assert!(load(&[("AFTER_SAVE", "sometimes")]).is_err());
        assert!(load(&[("SCAN_MAX_ATTEMPTS", "0")]).is_err());
        assert!(load(&[("RELOAD_DELAY_SECS", "soon")]).is_err());
    }
}
