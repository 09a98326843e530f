//! Tool configuration management
//!
//! Both binaries read the same optional TOML file. Command line arguments
//! take precedence over everything in it.
//!
//! ```toml
//! [device]
//! vendor_id = "0x1b1c"
//! product_id = "0x1b2e"
//!
//! [transfer]
//! scan_timeout_ms = 10
//! repl_timeout_ms = 100
//! reset_settle_ms = 2000
//!
//! [scan]
//! base = "0e 00"
//! first_position = 2
//! first_range = "00-ff"
//! second_range = "00-ff"
//!
//! [logging]
//! log_level = "info"
//! ```

use crate::driver::{ByteRange, ScanPlan};
use anyhow::{Context, Result, anyhow};
use protocol::Frame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Default target device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Vendor ID (`0x` hex or decimal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    /// Product ID (`0x` hex or decimal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSettings {
    /// Per-transfer timeout while scanning
    #[serde(default = "TransferSettings::default_scan_timeout")]
    pub scan_timeout_ms: u64,
    /// Per-transfer timeout in the interactive shell
    #[serde(default = "TransferSettings::default_repl_timeout")]
    pub repl_timeout_ms: u64,
    /// Wait after a reset request before re-acquiring the device
    #[serde(default = "TransferSettings::default_reset_settle")]
    pub reset_settle_ms: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            scan_timeout_ms: Self::default_scan_timeout(),
            repl_timeout_ms: Self::default_repl_timeout(),
            reset_settle_ms: Self::default_reset_settle(),
        }
    }
}

impl TransferSettings {
    fn default_scan_timeout() -> u64 {
        10
    }

    fn default_repl_timeout() -> u64 {
        100
    }

    fn default_reset_settle() -> u64 {
        2000
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn repl_timeout(&self) -> Duration {
        Duration::from_millis(self.repl_timeout_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }
}

/// Scan plan defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Leading bytes of every candidate, space separated hex
    #[serde(default = "ScanSettings::default_base")]
    pub base: String,
    /// Position of the first varied byte
    #[serde(default = "ScanSettings::default_first_position")]
    pub first_position: usize,
    #[serde(default = "ScanSettings::default_range")]
    pub first_range: String,
    #[serde(default = "ScanSettings::default_range")]
    pub second_range: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            first_position: Self::default_first_position(),
            first_range: Self::default_range(),
            second_range: Self::default_range(),
        }
    }
}

impl ScanSettings {
    fn default_base() -> String {
        "0e 00".to_string()
    }

    fn default_first_position() -> usize {
        2
    }

    fn default_range() -> String {
        "00-ff".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_level(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl ProbeConfig {
    /// Load configuration from file
    ///
    /// An explicit path must exist. Without one the standard locations are
    /// tried in order and it is an error if none exists.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::search_paths()
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found"))?,
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: ProbeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        if !Self::search_paths().iter().any(|p| p.exists()) {
            tracing::debug!("No configuration file found, using defaults");
            return Self::default();
        }
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-probe").join("probe.toml")
        } else {
            PathBuf::from(".config/usb-probe/probe.toml")
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        vec![
            Self::default_path(),
            PathBuf::from("/etc/usb-probe/probe.toml"),
        ]
    }

    /// Default vendor ID, if configured
    pub fn vendor_id(&self) -> Result<Option<u16>> {
        Self::parse_id(self.device.vendor_id.as_deref(), "vendor_id")
    }

    /// Default product ID, if configured
    pub fn product_id(&self) -> Result<Option<u16>> {
        Self::parse_id(self.device.product_id.as_deref(), "product_id")
    }

    fn parse_id(id: Option<&str>, name: &str) -> Result<Option<u16>> {
        id.map(|id| common::parse_usb_id(id).with_context(|| format!("Invalid {}", name)))
            .transpose()
    }

    /// Scan plan described by the `[scan]` section
    pub fn scan_plan(&self) -> Result<ScanPlan> {
        let base = parse_base(&self.scan.base)?;
        let first: ByteRange = self
            .scan
            .first_range
            .parse()
            .map_err(|e: String| anyhow!("Invalid first_range: {}", e))?;
        let second: ByteRange = self
            .scan
            .second_range
            .parse()
            .map_err(|e: String| anyhow!("Invalid second_range: {}", e))?;

        let plan = ScanPlan::new(base, self.scan.first_position)
            .map_err(|e| anyhow!("Invalid first_position: {}", e))?;
        Ok(plan.with_ranges(first, second))
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.log_level,
                valid_levels.join(", ")
            ));
        }

        self.vendor_id()?;
        self.product_id()?;

        if self.transfer.scan_timeout_ms == 0 || self.transfer.repl_timeout_ms == 0 {
            return Err(anyhow!("Transfer timeouts must be greater than zero"));
        }

        self.scan_plan()?;
        Ok(())
    }
}

/// Parse space separated hex bytes into a zero-padded frame
pub fn parse_base(base: &str) -> Result<Frame> {
    let bytes = base
        .split_whitespace()
        .map(|token| {
            u8::from_str_radix(token.trim_start_matches("0x"), 16)
                .map_err(|_| anyhow!("Invalid hex byte '{}' in scan base", token))
        })
        .collect::<Result<Vec<u8>>>()?;
    Frame::from_slice(&bytes).context("Invalid scan base")
}
