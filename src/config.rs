use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use bluest::Uuid;
use serde::Deserialize;

use crate::registers::RegisterRequest;
use crate::session::SessionConfig;

// GATT identifiers of the proprietary serial service exposed by the
// controller's BLE module.
const DEFAULT_SERVICE_UUID: &str = "0000ff00-0000-1000-8000-00805f9b34fb";
const DEFAULT_WRITE_CHARACTERISTIC_UUID: &str = "0000ff02-0000-1000-8000-00805f9b34fb";
const DEFAULT_NOTIFY_CHARACTERISTIC_UUID: &str = "0000ff01-0000-1000-8000-00805f9b34fb";

fn default_service_uuid() -> String {
    DEFAULT_SERVICE_UUID.into()
}

fn default_write_characteristic() -> String {
    DEFAULT_WRITE_CHARACTERISTIC_UUID.into()
}

fn default_notify_characteristic() -> String {
    DEFAULT_NOTIFY_CHARACTERISTIC_UUID.into()
}

fn default_wait_timeout_ms() -> u64 {
    5_000
}

fn default_overall_timeout_ms() -> u64 {
    30_000
}

/// Operator configuration: which device to talk to, where the register
/// block starts and the catalogue describing each register in it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Advertised name of the controller's BLE module.
    pub device_name: String,
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,
    #[serde(default = "default_write_characteristic")]
    pub write_characteristic: String,
    #[serde(default = "default_notify_characteristic")]
    pub notify_characteristic: String,
    /// First register of the block to read, in hex as the vendor tools
    /// print it, e.g. "3045".
    pub target_address: String,
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
    pub registers: Vec<RegisterRequest>,
}

impl Config {
    /// A configuration with the stock service and characteristic UUIDs and
    /// default timeouts.
    pub fn new(device_name: &str, target_address: &str, registers: Vec<RegisterRequest>) -> Self {
        Self {
            device_name: device_name.into(),
            service_uuid: default_service_uuid(),
            write_characteristic: default_write_characteristic(),
            notify_characteristic: default_notify_characteristic(),
            target_address: target_address.into(),
            wait_timeout_ms: default_wait_timeout_ms(),
            overall_timeout_ms: default_overall_timeout_ms(),
            registers,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("malformed config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.service_uuid()?;
        self.write_characteristic()?;
        self.notify_characteristic()?;
        self.target_address()?;
        if self.registers.is_empty() {
            bail!("no registers configured");
        }
        for register in &self.registers {
            if register.scale <= 0.0 {
                bail!(
                    "register {:?} has a non-positive scale",
                    register.description
                );
            }
        }
        Ok(())
    }

    pub fn service_uuid(&self) -> anyhow::Result<Uuid> {
        Uuid::parse_str(&self.service_uuid)
            .with_context(|| format!("invalid service UUID {:?}", self.service_uuid))
    }

    pub fn write_characteristic(&self) -> anyhow::Result<Uuid> {
        Uuid::parse_str(&self.write_characteristic)
            .with_context(|| format!("invalid characteristic UUID {:?}", self.write_characteristic))
    }

    pub fn notify_characteristic(&self) -> anyhow::Result<Uuid> {
        Uuid::parse_str(&self.notify_characteristic).with_context(|| {
            format!(
                "invalid characteristic UUID {:?}",
                self.notify_characteristic
            )
        })
    }

    pub fn target_address(&self) -> anyhow::Result<u16> {
        let digits = self.target_address.trim_start_matches("0x");
        u16::from_str_radix(digits, 16)
            .with_context(|| format!("invalid target address {:?}", self.target_address))
    }

    /// Session parameters derived from this configuration.
    pub fn session(&self) -> anyhow::Result<SessionConfig> {
        let mut session = SessionConfig::new(self.target_address()?);
        session.wait_timeout = Duration::from_millis(self.wait_timeout_ms);
        session.overall_timeout = Duration::from_millis(self.overall_timeout_ms);
        Ok(session)
    }
}

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_json::from_str(
        r#"{
            "device_name": "MT5075",
            "target_address": "3045",
            "registers": [
                {"address": "12357", "description": "Battery remaining capacity", "scale": 1, "unit": "%"},
                {"address": "12361", "description": "Battery power", "scale": 100, "unit": "W", "skip": true}
            ]
        }"#,
    )
    .unwrap();

    config.validate().unwrap();
    assert_eq!(config.target_address().unwrap(), 0x3045);
    assert_eq!(config.service_uuid().unwrap(), Uuid::from_u128(0x0000ff00_0000_1000_8000_00805f9b34fb));
    assert!(!config.registers[0].skip);
    assert!(config.registers[1].skip);

    let session = config.session().unwrap();
    assert_eq!(session.wait_timeout, Duration::from_secs(5));
    assert_eq!(session.overall_timeout, Duration::from_secs(30));
}

#[test]
fn test_reject_non_positive_scale() {
    let config = Config::new(
        "MT5075",
        "3045",
        vec![RegisterRequest {
            address: "12357".into(),
            description: "Battery remaining capacity".into(),
            scale: 0.0,
            unit: "%".into(),
            skip: false,
        }],
    );
    assert!(config.validate().is_err());
}

#[test]
fn test_reject_empty_catalogue() {
    let config = Config::new("MT5075", "3045", Vec::new());
    assert!(config.validate().is_err());
}

#[test]
fn test_reject_bad_target_address() {
    let config = Config::new(
        "MT5075",
        "0xzz",
        vec![RegisterRequest::new("12357", "Battery voltage", 100.0, "V")],
    );
    assert!(config.validate().is_err());
}
