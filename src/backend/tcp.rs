use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use color_eyre::eyre::{self, WrapErr};
use tokio_modbus::client::sync::{self, Reader};
use tokio_modbus::prelude::Slave;
use tracing::debug;

use crate::backend::Transport;

pub(crate) struct TcpTransport {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    context: Option<sync::Context>,
}

impl TcpTransport {
    pub(crate) fn new(host: &str, port: u16, unit_id: u8, timeout: Duration) -> Self {
        Self {
            host: host.to_owned(),
            port,
            unit_id,
            timeout,
            context: None,
        }
    }

    fn resolve(&self) -> eyre::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .wrap_err_with(|| format!("resolve {}:{}", self.host, self.port))?
            .next()
            .ok_or_else(|| eyre::eyre!("no address for {}:{}", self.host, self.port))
    }

    fn context(&mut self) -> eyre::Result<&mut sync::Context> {
        self.context
            .as_mut()
            .ok_or_else(|| eyre::eyre!("modbus connection is not open"))
    }
}

impl Transport for TcpTransport {
    fn open(&mut self) -> eyre::Result<()> {
        let addr = self.resolve()?;
        let context =
            sync::tcp::connect_slave_with_timeout(addr, Slave(self.unit_id), Some(self.timeout))
                .wrap_err_with(|| format!("connect to {addr}"))?;
        debug!(%addr, unit_id = self.unit_id, "modbus tcp connected");
        self.context = Some(context);
        Ok(())
    }

    fn read_holding_registers(&mut self, address: u16, quantity: u16) -> eyre::Result<Vec<u16>> {
        let response = self
            .context()?
            .read_holding_registers(address, quantity)
            .wrap_err("read holding registers")?;
        response.map_err(|exception| eyre::eyre!("device exception: {exception:?}"))
    }

    fn read_input_registers(&mut self, address: u16, quantity: u16) -> eyre::Result<Vec<u16>> {
        let response = self
            .context()?
            .read_input_registers(address, quantity)
            .wrap_err("read input registers")?;
        response.map_err(|exception| eyre::eyre!("device exception: {exception:?}"))
    }

    fn close(&mut self) -> eyre::Result<()> {
        // Dropping the context shuts the socket down.
        if self.context.take().is_some() {
            debug!(host = %self.host, port = self.port, "modbus tcp disconnected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use super::TcpTransport;
    use crate::backend::Transport;

    #[test]
    fn reads_fail_before_open() {
        let mut transport = TcpTransport::new("127.0.0.1", 502, 1, Duration::from_millis(100));
        let err = transport
            .read_holding_registers(0, 1)
            .expect_err("read should fail without connection");
        assert!(err.to_string().contains("not open"));
    }

    #[test]
    fn open_fails_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let mut transport = TcpTransport::new("127.0.0.1", port, 1, Duration::from_millis(500));
        let err = transport.open().expect_err("connect should be refused");
        assert!(err.to_string().contains("connect to"));
    }

    #[test]
    fn close_is_idempotent() {
        let mut transport = TcpTransport::new("127.0.0.1", 502, 1, Duration::from_millis(100));
        transport.close().expect("close without connection");
        transport.close().expect("second close");
    }
}
