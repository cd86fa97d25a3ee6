//! UART transport over a raw serial line.
//!
//! The retimer's management MCU speaks a self-synchronizing packet
//! protocol: `SYNC(0xA5) | LEN | SLAVE | PAYLOAD[LEN] | CRC8`. The CRC
//! uses the PEC polynomial (0x07) and covers LEN through the end of the
//! payload. A receiver discards bytes until SYNC and resynchronizes on
//! framing errors.
//!
//! UART carries no true bus, so `write_read` is two consecutive frames:
//! the request carries a correlation cookie as its last payload byte and
//! the response echoes the cookie as payload[0], followed by a status
//! byte and any data.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use serialport::SerialPort;

use crate::consts::timing;
use crate::consts::uart::{status, MAX_PAYLOAD, SYNC};
use crate::error::{bus_error, Error, Result};
use crate::pec;
use crate::transport::{with_retry, Transport, TransportKind};

pub struct UartTransport {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
    timeout: Duration,
    cookie: u8,
}

impl std::fmt::Debug for UartTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UartTransport")
            .field("port_name", &self.port_name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl UartTransport {
    /// Opens the serial port at 8N1 with the default operation timeout
    /// and flushes any stale bytes.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let timeout = Duration::from_millis(timing::OP_TIMEOUT_MS);
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => {
                    Error::AdapterNotFound(format!("serial port {port_name}: {e}"))
                }
                _ => Error::AdapterBusy(format!("serial port {port_name}: {e}")),
            })?;
        port.clear(serialport::ClearBuffer::All)
            .map_err(Error::Serial)?;
        debug!("serial port {port_name} opened at {baud_rate} baud");
        Ok(UartTransport {
            port: Some(port),
            port_name: port_name.to_string(),
            timeout,
            cookie: 0,
        })
    }

    fn handle(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("transport is closed".to_string()))
    }

    fn next_cookie(&mut self) -> u8 {
        self.cookie = self.cookie.wrapping_add(1);
        self.cookie
    }

    fn send_frame(&mut self, slave_addr: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::InvalidArgument(format!(
                "UART payload of {} bytes exceeds frame limit",
                payload.len()
            )));
        }
        let mut frame = Vec::with_capacity(payload.len() + 4);
        frame.push(SYNC);
        frame.push(payload.len() as u8);
        frame.push(slave_addr);
        frame.extend_from_slice(payload);
        // CRC excludes SYNC so a corrupted sync byte cannot fake a frame.
        frame.push(pec::crc8(&frame[1..]));
        trace!("UART TX frame: {:02X?}", frame);

        let port = self.handle()?;
        port.write_all(&frame).map_err(map_io)?;
        port.flush().map_err(map_io)?;
        Ok(())
    }

    /// Reads one well-formed frame, discarding noise until SYNC and
    /// resynchronizing after CRC failures, until `deadline`.
    fn recv_frame(&mut self, deadline: Instant) -> Result<(u8, Vec<u8>)> {
        loop {
            if Instant::now() >= deadline {
                return Err(Error::Timeout("uart receive"));
            }
            let mut byte = [0u8; 1];
            match self.handle()?.read_exact(&mut byte) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(Error::Timeout("uart receive"));
                }
                Err(e) => return Err(map_io(e)),
            }
            if byte[0] != SYNC {
                trace!("UART resync: discarding 0x{:02X}", byte[0]);
                continue;
            }

            let mut header = [0u8; 2];
            if let Err(e) = self.handle()?.read_exact(&mut header) {
                if e.kind() == std::io::ErrorKind::TimedOut {
                    return Err(Error::Timeout("uart receive"));
                }
                return Err(map_io(e));
            }
            let len = header[0] as usize;
            let slave = header[1];

            let mut rest = vec![0u8; len + 1];
            if let Err(e) = self.handle()?.read_exact(&mut rest) {
                if e.kind() == std::io::ErrorKind::TimedOut {
                    return Err(Error::Timeout("uart receive"));
                }
                return Err(map_io(e));
            }
            let (payload, crc) = rest.split_at(len);

            let mut covered = Vec::with_capacity(len + 2);
            covered.push(header[0]);
            covered.push(header[1]);
            covered.extend_from_slice(payload);
            let computed = pec::crc8(&covered);
            if crc[0] != computed {
                warn!(
                    "UART frame CRC mismatch (got 0x{:02X}, computed 0x{computed:02X}), resyncing",
                    crc[0]
                );
                continue;
            }
            return Ok((slave, payload.to_vec()));
        }
    }

    /// Sends a request frame and waits for the cookie-matched response.
    /// Response payload: `cookie | status | data…`.
    fn exchange(&mut self, slave_addr: u8, request: &[u8], read_len: usize) -> Result<Vec<u8>> {
        let cookie = self.next_cookie();
        let mut payload = Vec::with_capacity(request.len() + 1);
        payload.extend_from_slice(request);
        payload.push(cookie);
        self.send_frame(slave_addr, &payload)?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let (_, response) = self.recv_frame(deadline)?;
            if response.first() != Some(&cookie) {
                trace!("UART response with stale cookie, discarding");
                continue;
            }
            if response.len() < 2 {
                return Err(Error::Framing("UART response missing status byte".into()));
            }
            match response[1] {
                status::OK => {}
                status::NAK => {
                    return Err(Error::Nak {
                        address: slave_addr,
                    })
                }
                other => {
                    return Err(bus_error(format!(
                        "UART response reported bus fault (status 0x{other:02X})"
                    )))
                }
            }
            let data = &response[2..];
            if data.len() < read_len {
                return Err(Error::Framing(format!(
                    "UART response carried {} data bytes, wanted {read_len}",
                    data.len()
                )));
            }
            return Ok(data[..read_len].to_vec());
        }
    }
}

fn map_io(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::TimedOut {
        Error::Timeout("uart transfer")
    } else {
        Error::Io(e)
    }
}

impl Transport for UartTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Uart
    }

    fn write(&mut self, slave_addr: u8, bytes: &[u8]) -> Result<()> {
        with_retry("uart write", || {
            self.exchange(slave_addr, bytes, 0).map(|_| ())
        })
    }

    fn read(&mut self, slave_addr: u8, len: usize) -> Result<Vec<u8>> {
        with_retry("uart read", || self.exchange(slave_addr, &[], len))
    }

    fn write_read(
        &mut self,
        slave_addr: u8,
        write_bytes: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>> {
        with_retry("uart write_read", || {
            self.exchange(slave_addr, write_bytes, read_len)
        })
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("serial port {} closed", self.port_name);
        }
        Ok(())
    }
}

impl Drop for UartTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_crc_excludes_sync() {
        // Frame: SYNC | LEN | SLAVE | PAYLOAD | CRC, CRC over LEN..payload.
        let payload = [0x05u8, 0x04, 0x00, 0x00, 0x00, 0x01];
        let mut covered = vec![payload.len() as u8, 0x50];
        covered.extend_from_slice(&payload);
        let crc = pec::crc8(&covered);

        let mut frame = vec![SYNC];
        frame.extend_from_slice(&covered);
        frame.push(crc);
        assert_eq!(frame[0], 0xA5);
        assert_eq!(frame.len(), payload.len() + 4);
        assert_eq!(pec::crc8(&frame[1..frame.len() - 1]), *frame.last().unwrap());
    }
}
