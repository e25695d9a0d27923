use std::fs;
use std::path::Path;

use color_eyre::eyre::{self, WrapErr};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::constants::{
    DEFAULT_CONNECT_ATTEMPTS, DEFAULT_INTERVAL_SECS, DEFAULT_MODBUS_PORT, DEFAULT_RETRY_BACKOFF_MS,
    DEFAULT_TIMEOUT_MS, DEFAULT_UNIT_ID, UNKNOWN,
};
use crate::descriptor::RegisterDescriptor;
use crate::error::RegisterError;
use crate::record::OwnerInfo;

/// Contents of one device configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub modbus: ModbusSection,
    #[serde(default)]
    pub owner: OwnerInfo,
    #[serde(default)]
    pub registers: Mapping,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSection {
    #[serde(default = "default_name")]
    pub name: String,
    /// Seconds between cycle starts.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            interval: DEFAULT_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModbusSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ModbusSection {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_MODBUS_PORT,
            unit_id: DEFAULT_UNIT_ID,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

/// Result of parsing the `registers` table.
#[derive(Debug, Default)]
pub struct DescriptorSet {
    pub descriptors: Vec<RegisterDescriptor>,
    pub errors: Vec<RegisterError>,
}

impl DeviceConfig {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("reading config: {}", path.display()))?;
        Self::parse(&raw).wrap_err_with(|| format!("loading config: {}", path.display()))
    }

    pub fn parse(raw: &str) -> eyre::Result<Self> {
        let config: Self = serde_yaml::from_str(raw).wrap_err("parsing yaml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.device.interval == 0 {
            return Err(eyre::eyre!("device.interval must be at least 1 second"));
        }
        if self.modbus.connect_attempts == 0 {
            return Err(eyre::eyre!("modbus.connect_attempts must be at least 1"));
        }
        if self.modbus.timeout_ms == 0 {
            return Err(eyre::eyre!("modbus.timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Parses every register entry in declaration order.
    ///
    /// A bad entry is reported in `errors` and does not affect the others.
    pub fn descriptors(&self) -> DescriptorSet {
        let mut set = DescriptorSet::default();
        for (key, value) in &self.registers {
            let name = match key {
                Value::String(name) => name.clone(),
                other => yaml_scalar(other),
            };
            let parsed = match value {
                Value::String(line) => RegisterDescriptor::parse(&name, line),
                _ => Err(RegisterError::config(
                    &name,
                    "expected a \"functionCode, address, quantity, dataType, scale[, byteFormat]\" string",
                )),
            };
            match parsed {
                Ok(descriptor) => set.descriptors.push(descriptor),
                Err(err) => set.errors.push(err),
            }
        }
        set
    }
}

fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => format!("{value:?}"),
    }
}

fn default_name() -> String {
    UNKNOWN.to_owned()
}

const fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

const fn default_port() -> u16 {
    DEFAULT_MODBUS_PORT
}

const fn default_unit_id() -> u8 {
    DEFAULT_UNIT_ID
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_connect_attempts() -> u32 {
    DEFAULT_CONNECT_ATTEMPTS
}

const fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}
