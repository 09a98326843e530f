//! Command line arguments shared by both tools

use crate::config::ProbeConfig;
use crate::usb::SessionOptions;
use anyhow::{Context, Result};
use clap::Args;
use protocol::{EndpointOverride, ProtocolVersion};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration and logging flags
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    pub save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    /// Load the configuration named by `--config`, or the default one
    pub fn load_config(&self) -> Result<ProbeConfig> {
        match &self.config {
            Some(path) => {
                let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
                ProbeConfig::load(Some(expanded)).context("Failed to load configuration")
            }
            None => Ok(ProbeConfig::load_or_default()),
        }
    }

    /// Handle `--save-config`; returns true when the tool should exit
    pub fn save_config_requested(&self) -> Result<bool> {
        if !self.save_config {
            return Ok(false);
        }
        let path = ProbeConfig::default_path();
        ProbeConfig::default()
            .save(&path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        Ok(true)
    }
}

/// Target device and dialect selection
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// USB vendor ID to connect to (0x hex or decimal)
    #[arg(short = 'v', long = "vendor", value_name = "ID", value_parser = parse_id)]
    pub vendor_id: Option<u16>,

    /// USB product ID to connect to (0x hex or decimal); found among the
    /// attached devices for vendor 0x1b1c when omitted
    #[arg(short = 'p', long = "product", value_name = "ID", value_parser = parse_id)]
    pub product_id: Option<u16>,

    /// Use the endpoints of protocol version 1
    #[arg(short = '1', conflicts_with_all = ["v2", "v3", "input", "output"])]
    pub v1: bool,

    /// Use the endpoints of protocol version 2
    #[arg(short = '2', conflicts_with_all = ["v3", "input", "output"])]
    pub v2: bool,

    /// Use the endpoints of protocol version 3
    #[arg(short = '3', conflicts_with_all = ["input", "output"])]
    pub v3: bool,

    /// Receive from this endpoint
    #[arg(short = 'i', long = "input", value_name = "EP", value_parser = parse_ep)]
    pub input: Option<u8>,

    /// Send to this endpoint
    #[arg(short = 'o', long = "output", value_name = "EP", value_parser = parse_ep)]
    pub output: Option<u8>,

    /// Reset the device before starting
    #[arg(short = 'r', long)]
    pub reset: bool,

    /// Verbose output (debug logging, frame dumps)
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Per-transfer timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

fn parse_id(input: &str) -> std::result::Result<u16, String> {
    common::parse_usb_id(input).map_err(|e| e.to_string())
}

fn parse_ep(input: &str) -> std::result::Result<u8, String> {
    common::parse_endpoint(input).map_err(|e| e.to_string())
}

/// Argument problems reported together with the usage text
#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("USB {name} ID is missing. You probably forgot to specify {flag}.")]
    MissingId {
        name: &'static str,
        flag: &'static str,
    },

    #[error("Invalid configured device ID: {0:#}")]
    Config(anyhow::Error),
}

impl DeviceArgs {
    /// Requested dialect
    pub fn protocol(&self) -> ProtocolVersion {
        if self.v1 {
            ProtocolVersion::V1
        } else if self.v2 {
            ProtocolVersion::V2
        } else if self.v3 {
            ProtocolVersion::V3
        } else if self.input.is_some() || self.output.is_some() {
            ProtocolVersion::Override
        } else {
            ProtocolVersion::Auto
        }
    }

    pub fn endpoint_override(&self) -> EndpointOverride {
        EndpointOverride::new(self.input, self.output)
    }

    /// Effective log level for these arguments
    pub fn log_level<'a>(&self, global: &'a GlobalArgs, config: &'a ProbeConfig) -> &'a str {
        common::log_level_for(
            global.log_level.as_deref(),
            self.verbose,
            &config.logging.log_level,
        )
    }

    /// Merge arguments with configured defaults
    ///
    /// `default_timeout` applies when neither `--timeout-ms` nor anything
    /// more specific was given. `discover` is asked for a product ID only
    /// when neither the arguments nor the configuration name one.
    pub fn session_options<F>(
        &self,
        config: &ProbeConfig,
        default_timeout: Duration,
        discover: F,
    ) -> std::result::Result<SessionOptions, ArgsError>
    where
        F: FnOnce(u16) -> Option<u16>,
    {
        let vendor_id = match self.vendor_id {
            Some(id) => id,
            None => config
                .vendor_id()
                .map_err(ArgsError::Config)?
                .ok_or(ArgsError::MissingId {
                    name: "Vendor",
                    flag: "-v",
                })?,
        };
        let product_id = match self.product_id {
            Some(id) => id,
            None => config
                .product_id()
                .map_err(ArgsError::Config)?
                .or_else(|| discover(vendor_id))
                .ok_or(ArgsError::MissingId {
                    name: "Product",
                    flag: "-p",
                })?,
        };

        let timeout = self
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);

        Ok(SessionOptions::new(vendor_id, product_id)
            .with_protocol(self.protocol())
            .with_endpoints(self.endpoint_override())
            .with_timeout(timeout))
    }
}

/// Warn when claiming interfaces will likely be refused
pub fn warn_if_unprivileged() {
    #[cfg(target_os = "linux")]
    {
        if !nix::unistd::Uid::effective().is_root() {
            tracing::warn!("Not running as root; claiming interfaces may fail without a udev rule");
        } else {
            tracing::debug!("Running as root");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    #[command(disable_version_flag = true)]
    struct TestCli {
        #[command(flatten)]
        device: DeviceArgs,
    }

    #[test]
    fn test_parse_device_args() {
        let cli = TestCli::try_parse_from(["t", "-v", "0x1b1c", "-p", "6958", "-2", "-V"]).unwrap();
        assert_eq!(cli.device.vendor_id, Some(0x1b1c));
        assert_eq!(cli.device.product_id, Some(6958));
        assert_eq!(cli.device.protocol(), ProtocolVersion::V2);
        assert!(cli.device.verbose);
    }

    #[test]
    fn test_dialect_flags_conflict() {
        assert!(TestCli::try_parse_from(["t", "-1", "-3"]).is_err());
        assert!(TestCli::try_parse_from(["t", "-2", "-i", "0x82"]).is_err());
    }

    #[test]
    fn test_endpoints_select_override() {
        let cli = TestCli::try_parse_from(["t", "-i", "0x83", "-o", "4"]).unwrap();
        assert_eq!(cli.device.protocol(), ProtocolVersion::Override);
        assert_eq!(
            cli.device.endpoint_override(),
            EndpointOverride::new(Some(0x83), Some(0x04))
        );
    }

    #[test]
    fn test_invalid_ids_rejected() {
        assert!(TestCli::try_parse_from(["t", "-v", "0"]).is_err());
        assert!(TestCli::try_parse_from(["t", "-p", "0x10000"]).is_err());
    }

    #[test]
    fn test_session_options_fall_back_to_config() {
        let mut config = ProbeConfig::default();
        config.device.vendor_id = Some("0x1b1c".to_string());

        let cli = TestCli::try_parse_from(["t", "-p", "0x1b2e"]).unwrap();
        let options = cli
            .device
            .session_options(&config, Duration::from_millis(10), |_| None)
            .unwrap();
        assert_eq!(options.vendor_id, 0x1b1c);
        assert_eq!(options.product_id, 0x1b2e);
        assert_eq!(options.timeout, Duration::from_millis(10));

        let cli = TestCli::try_parse_from(["t", "-v", "0x1b1c"]).unwrap();
        let err = cli
            .device
            .session_options(&ProbeConfig::default(), Duration::from_millis(10), |_| None)
            .unwrap_err();
        assert!(matches!(err, ArgsError::MissingId { flag: "-p", .. }));
    }

    #[test]
    fn test_missing_product_is_discovered() {
        let cli = TestCli::try_parse_from(["t", "-v", "0x1b1c"]).unwrap();
        let mut asked = None;
        let options = cli
            .device
            .session_options(&ProbeConfig::default(), Duration::from_millis(10), |vendor| {
                asked = Some(vendor);
                Some(0x1b3d)
            })
            .unwrap();
        assert_eq!(asked, Some(0x1b1c));
        assert_eq!(options.product_id, 0x1b3d);

        // Explicit and configured IDs win without a lookup
        let mut config = ProbeConfig::default();
        config.device.product_id = Some("0x1b2e".to_string());
        let options = cli
            .device
            .session_options(&config, Duration::from_millis(10), |_| {
                panic!("lookup with a configured product")
            })
            .unwrap();
        assert_eq!(options.product_id, 0x1b2e);
    }
}
