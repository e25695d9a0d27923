use color_eyre::eyre;

use crate::interface::InterfaceMode;
use crate::poller::TransportConfig;

mod tcp;

#[cfg(debug_assertions)]
mod sim;

/// Register-level access to one Modbus device.
///
/// Calls are issued one at a time by the polling worker, so implementations
/// never see concurrent requests.
pub(crate) trait Transport {
    fn open(&mut self) -> eyre::Result<()>;
    fn read_holding_registers(&mut self, address: u16, quantity: u16) -> eyre::Result<Vec<u16>>;
    fn read_input_registers(&mut self, address: u16, quantity: u16) -> eyre::Result<Vec<u16>>;
    fn close(&mut self) -> eyre::Result<()>;
}

pub(crate) fn build_transport(config: &TransportConfig) -> eyre::Result<Box<dyn Transport + Send>> {
    match config.interface {
        InterfaceMode::Tcp => {
            let host = config
                .host
                .as_ref()
                .ok_or_else(|| eyre::eyre!("modbus host required"))?;
            let transport = tcp::TcpTransport::new(host, config.port, config.unit_id, config.timeout);
            Ok(Box::new(transport))
        }
        InterfaceMode::Simulation => {
            #[cfg(debug_assertions)]
            {
                Ok(Box::new(sim::SimTransport::new()))
            }
            #[cfg(not(debug_assertions))]
            {
                Err(eyre::eyre!("simulation not available in release builds"))
            }
        }
    }
}
