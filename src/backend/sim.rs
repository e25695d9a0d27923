use color_eyre::eyre;

use crate::backend::Transport;
use crate::descriptor::FunctionCode;
use crate::sim::SimDevice;

pub(crate) struct SimTransport {
    device: SimDevice,
    open: bool,
}

impl SimTransport {
    pub(crate) fn new() -> Self {
        Self {
            device: SimDevice::new(),
            open: false,
        }
    }

    fn read(&mut self, function: FunctionCode, address: u16, quantity: u16) -> eyre::Result<Vec<u16>> {
        if !self.open {
            return Err(eyre::eyre!("simulated connection is not open"));
        }
        self.device.tick();
        self.device
            .read(function, address, quantity)
            .map_err(|exception| eyre::eyre!("device exception: {exception}"))
    }
}

impl Transport for SimTransport {
    fn open(&mut self) -> eyre::Result<()> {
        self.open = true;
        Ok(())
    }

    fn read_holding_registers(&mut self, address: u16, quantity: u16) -> eyre::Result<Vec<u16>> {
        self.read(FunctionCode::ReadHoldingRegisters, address, quantity)
    }

    fn read_input_registers(&mut self, address: u16, quantity: u16) -> eyre::Result<Vec<u16>> {
        self.read(FunctionCode::ReadInputRegisters, address, quantity)
    }

    fn close(&mut self) -> eyre::Result<()> {
        self.open = false;
        Ok(())
    }
}
