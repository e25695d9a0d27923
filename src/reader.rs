use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::backend::Transport;
use crate::decode::decode_register;
use crate::descriptor::{FunctionCode, RegisterDescriptor};
use crate::error::RegisterError;
use crate::record::DecodedValue;

/// Words returned by one read call, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawReading<'a> {
    pub descriptor: &'a RegisterDescriptor,
    pub words: Vec<u16>,
    pub latency: Duration,
    pub captured_at: DateTime<Local>,
}

impl RawReading<'_> {
    pub fn decode(self) -> Result<DecodedValue, RegisterError> {
        let descriptor = self.descriptor;
        let raw = decode_register(&self.words, descriptor.data_type, descriptor.byte_format)
            .map_err(|err| RegisterError::from_decode(&descriptor.name, err))?;
        Ok(DecodedValue {
            descriptor: descriptor.clone(),
            scaled: raw.scaled(descriptor.scale),
            raw,
            words: self.words,
            latency: self.latency,
        })
    }
}

/// Issues the single read call for `descriptor` and times it.
pub(crate) fn read_register<'a>(
    transport: &mut dyn Transport,
    descriptor: &'a RegisterDescriptor,
) -> Result<RawReading<'a>, RegisterError> {
    let captured_at = Local::now();
    let started = Instant::now();
    let result = match descriptor.function {
        FunctionCode::ReadHoldingRegisters => {
            transport.read_holding_registers(descriptor.address, descriptor.quantity)
        }
        FunctionCode::ReadInputRegisters => {
            transport.read_input_registers(descriptor.address, descriptor.quantity)
        }
    };
    let latency = started.elapsed();

    let transport_error = |cause: String| RegisterError::Transport {
        register: descriptor.name.clone(),
        address: descriptor.address,
        function_code: descriptor.function.code(),
        cause,
    };

    let words = result.map_err(|err| transport_error(format!("{err:#}")))?;
    if words.len() < usize::from(descriptor.quantity) {
        return Err(transport_error(format!(
            "short response: expected {} registers, got {}",
            descriptor.quantity,
            words.len()
        )));
    }

    Ok(RawReading {
        descriptor,
        words,
        latency,
        captured_at,
    })
}
