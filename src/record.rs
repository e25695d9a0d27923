use std::fmt::Write as _;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::constants::UNKNOWN;
use crate::decode::RawValue;
use crate::descriptor::RegisterDescriptor;

/// One successfully decoded register from one cycle.
#[derive(Debug, Clone)]
pub struct DecodedValue {
    pub descriptor: RegisterDescriptor,
    pub words: Vec<u16>,
    pub raw: RawValue,
    pub scaled: f64,
    pub latency: Duration,
}

impl DecodedValue {
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnerInfo {
    #[serde(default = "unknown")]
    pub customer_id: String,
    #[serde(default = "unknown")]
    pub tag_host: String,
    #[serde(default = "unknown")]
    pub tag_name: String,
}

impl Default for OwnerInfo {
    fn default() -> Self {
        Self {
            customer_id: unknown(),
            tag_host: unknown(),
            tag_name: unknown(),
        }
    }
}

fn unknown() -> String {
    UNKNOWN.to_owned()
}

/// Writes measurement records for one device.
#[derive(Debug, Clone)]
pub struct RecordLogger {
    owner: OwnerInfo,
    device: String,
}

impl RecordLogger {
    pub fn new(owner: OwnerInfo, device: impl Into<String>) -> Self {
        Self {
            owner,
            device: device.into(),
        }
    }

    pub fn log(&self, value: &DecodedValue) {
        info!(target: "modstar::record", "{}", self.format(value));
    }

    pub fn format(&self, value: &DecodedValue) -> String {
        let desc = &value.descriptor;
        format!(
            "Customer: {:<3} || Host: {:<15} || Tag: {:<15} || Device: {:<8} || Register: {:<10}|| \
             Address: {:<5} || Quantity: {:<2} || Function Code: {:<2} || Hex Value: {:<35}|| \
             Raw Value: {:<30} || Scaled Value: {:<35} || Data Type: {:<8} || Byte Format: {:<7} || \
             Ping Time: {:8.2} ms",
            self.owner.customer_id,
            self.owner.tag_host,
            self.owner.tag_name,
            self.device,
            desc.name,
            desc.address,
            desc.quantity,
            desc.function.code(),
            hex_words(&value.words),
            value.raw.to_string(),
            value.scaled.to_string(),
            desc.data_type,
            desc.byte_format,
            value.latency_ms(),
        )
    }
}

pub fn hex_words(words: &[u16]) -> String {
    let mut out = String::with_capacity(words.len() * 7);
    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        let _ = write!(out, "0x{word:04X}");
    }
    out
}
