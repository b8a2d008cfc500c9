//! USB serial link to the load-cell firmware.
use std::io::Read;
use std::time::{Duration, Instant};

use coinbank_traits::{LinkRead, SensorLink};
use serialport::{SerialPort, SerialPortType};

use crate::error::{IoError, Result};
use crate::lines::LineBuffer;

/// Upper bound on one blocking port read so the deadline is honoured.
const READ_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SerialLinkCfg {
    /// Port used when auto-detect is off or finds nothing.
    pub port: String,
    pub auto_detect: bool,
    pub baud: u32,
    /// Wait after opening (the board resets on connect) before flushing input.
    pub settle: Duration,
}

impl Default for SerialLinkCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM1".to_string(),
            auto_detect: true,
            baud: 115_200,
            settle: Duration::from_secs(3),
        }
    }
}

/// First USB port whose product or manufacturer string mentions Arduino.
pub fn find_arduino_port() -> Option<String> {
    let ports = match serialport::available_ports() {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "listing serial ports failed");
            return None;
        }
    };
    ports.into_iter().find_map(|p| match &p.port_type {
        SerialPortType::UsbPort(info)
            if [info.product.as_deref(), info.manufacturer.as_deref()]
                .into_iter()
                .flatten()
                .any(|s| s.to_ascii_lowercase().contains("arduino")) =>
        {
            Some(p.port_name)
        }
        _ => None,
    })
}

pub struct SerialLink {
    cfg: SerialLinkCfg,
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
    buf: LineBuffer,
}

impl core::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.port_name)
            .field("baud", &self.cfg.baud)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialLink {
    /// Resolve the port, open it, wait `settle`, then drop stale input.
    pub fn open(cfg: SerialLinkCfg) -> Result<Self> {
        let mut link = Self::disconnected(cfg);
        link.connect()?;
        Ok(link)
    }

    /// Like [`SerialLink::open`], but a missing or busy port is not fatal:
    /// the link starts closed, reads fail with [`IoError::Closed`] and
    /// `reconnect` keeps trying until the board shows up.
    pub fn open_waiting(cfg: SerialLinkCfg) -> Self {
        let mut link = Self::disconnected(cfg);
        if let Err(e) = link.connect() {
            tracing::warn!(
                error = %e,
                port = %link.port_name,
                "sensor not available yet, will retry"
            );
        }
        link
    }

    fn disconnected(cfg: SerialLinkCfg) -> Self {
        Self {
            port_name: cfg.port.clone(),
            cfg,
            port: None,
            buf: LineBuffer::default(),
        }
    }

    fn resolve_port(&self) -> String {
        if self.cfg.auto_detect
            && let Some(found) = find_arduino_port()
        {
            tracing::info!(port = %found, "found Arduino");
            return found;
        }
        self.cfg.port.clone()
    }

    fn connect(&mut self) -> Result<()> {
        let name = self.resolve_port();
        if name.is_empty() {
            return Err(IoError::NoPort);
        }
        tracing::info!(port = %name, baud = self.cfg.baud, "opening serial port");
        let port = serialport::new(&name, self.cfg.baud)
            .timeout(READ_SLICE)
            .open()
            .map_err(|e| IoError::PortOpen {
                port: name.clone(),
                reason: e.to_string(),
            })?;
        std::thread::sleep(self.cfg.settle);
        port.clear(serialport::ClearBuffer::Input)
            .map_err(|e| IoError::Io(e.into()))?;
        self.buf.clear();
        self.port = Some(port);
        self.port_name = name;
        Ok(())
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl SensorLink for SerialLink {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<LinkRead, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(line) = self.buf.next_line() {
            return Ok(LinkRead::Line(line));
        }
        let port = self.port.as_mut().ok_or(IoError::Closed)?;
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 256];
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(LinkRead::Timeout);
            }
            port.set_timeout(left.min(READ_SLICE))
                .map_err(|e| IoError::Io(e.into()))?;
            match port.read(&mut chunk) {
                Ok(0) => return Err(Box::new(IoError::Closed)),
                Ok(n) => {
                    self.buf.push(&chunk[..n]);
                    if let Some(line) = self.buf.next_line() {
                        tracing::trace!(line = %line, "raw from sensor");
                        return Ok(LinkRead::Line(line));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(Box::new(IoError::Io(e))),
            }
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.port.take().is_some() {
            tracing::info!(port = %self.port_name, "serial port closed");
        }
        Ok(())
    }

    fn reconnect(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.port = None;
        self.connect()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absent_port() -> SerialLinkCfg {
        SerialLinkCfg {
            port: "/dev/coinbank-test-no-such-port".to_string(),
            auto_detect: false,
            settle: Duration::ZERO,
            ..SerialLinkCfg::default()
        }
    }

    #[test]
    fn open_fails_on_absent_port() {
        let err = SerialLink::open(absent_port()).unwrap_err();
        assert!(matches!(err, IoError::PortOpen { .. }));
    }

    #[test]
    fn open_waiting_starts_closed_and_keeps_retrying() {
        let mut link = SerialLink::open_waiting(absent_port());
        assert!(!link.is_open());
        assert_eq!(link.port_name(), "/dev/coinbank-test-no-such-port");

        let err = link.read_line(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err.downcast_ref::<IoError>(), Some(IoError::Closed)));

        assert!(link.reconnect().is_err());
        assert!(!link.is_open());
    }
}
