use std::collections::BTreeMap;

use crate::descriptor::FunctionCode;

pub const REG_VOLTAGE: u16 = 0x0000;
pub const REG_ENERGY: u16 = 0x0002;
pub const REG_TEMPERATURE: u16 = 0x0004;
pub const REG_UPTIME: u16 = 0x0008;
pub const REG_FREQUENCY: u16 = 0x0000;
pub const REG_STATUS: u16 = 0x0002;

const MAX_READ_QUANTITY: u16 = 125;

/// Simulated meter with a small holding and input register bank.
///
/// Values drift on every tick; multi-word values are stored in the byte
/// formats listed in `config/modstar-simulation.yaml`.
#[derive(Debug, Clone)]
pub struct SimDevice {
    tick: u32,
    energy_wh: u32,
    holding: BTreeMap<u16, u16>,
    input: BTreeMap<u16, u16>,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDevice {
    pub fn new() -> Self {
        let mut device = Self {
            tick: 0,
            energy_wh: 1_000_000,
            holding: BTreeMap::new(),
            input: BTreeMap::new(),
        };
        device.refresh();
        device
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.energy_wh = self.energy_wh.wrapping_add(7);
        self.refresh();
    }

    pub fn read(&self, function: FunctionCode, address: u16, quantity: u16) -> Result<Vec<u16>, String> {
        if quantity == 0 || quantity > MAX_READ_QUANTITY {
            return Err(format!("illegal data value: quantity {quantity}"));
        }
        let bank = match function {
            FunctionCode::ReadHoldingRegisters => &self.holding,
            FunctionCode::ReadInputRegisters => &self.input,
        };
        (0..quantity)
            .map(|offset| {
                let register = address
                    .checked_add(offset)
                    .ok_or_else(|| "illegal data address".to_owned())?;
                bank.get(&register)
                    .copied()
                    .ok_or_else(|| format!("illegal data address: {register}"))
            })
            .collect()
    }

    fn refresh(&mut self) {
        let phase = f64::from(self.tick % 60) / 60.0 * std::f64::consts::TAU;

        #[allow(clippy::cast_possible_truncation)]
        let voltage = (230.0 + 4.0 * phase.sin()) as f32;
        let [hi, lo] = split_u32(voltage.to_bits());
        self.holding.insert(REG_VOLTAGE, hi);
        self.holding.insert(REG_VOLTAGE + 1, lo);

        // Word-swapped (CDAB) counter.
        let [hi, lo] = split_u32(self.energy_wh);
        self.holding.insert(REG_ENERGY, lo);
        self.holding.insert(REG_ENERGY + 1, hi);

        #[allow(clippy::cast_possible_truncation)]
        let temperature = (-50.0 + 30.0 * phase.cos()).round() as i16;
        self.holding
            .insert(REG_TEMPERATURE, u16::from_be_bytes(temperature.to_be_bytes()));

        let uptime_ms = u64::from(self.tick) * 5_000;
        for (offset, word) in (0u16..).zip(split_u64(uptime_ms)) {
            self.holding.insert(REG_UPTIME + offset, word);
        }

        #[allow(clippy::cast_possible_truncation)]
        let frequency = (50.0 + 0.05 * phase.sin()) as f32;
        // Fully swapped (DCBA) float.
        let [hi, lo] = split_u32(frequency.to_bits());
        self.input.insert(REG_FREQUENCY, lo.swap_bytes());
        self.input.insert(REG_FREQUENCY + 1, hi.swap_bytes());

        // Byte-swapped (BA) status word.
        let status: u16 = if self.tick % 10 == 9 { 0x0003 } else { 0x0001 };
        self.input.insert(REG_STATUS, status.swap_bytes());
    }
}

#[allow(clippy::cast_possible_truncation)]
fn split_u32(value: u32) -> [u16; 2] {
    [(value >> 16) as u16, value as u16]
}

#[allow(clippy::cast_possible_truncation)]
fn split_u64(value: u64) -> [u16; 4] {
    [
        (value >> 48) as u16,
        (value >> 32) as u16,
        (value >> 16) as u16,
        value as u16,
    ]
}
