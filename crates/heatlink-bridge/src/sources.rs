//! Raw input sources feeding the decode cycle.
//!
//! The core consumes plain lines and voltages; these seams keep the serial
//! port and the ADC hardware on the bridge's side of the boundary.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use serialport::SerialPort;
use thiserror::Error;
use tracing::debug;

use crate::config::{AdcSettings, SerialSettings};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("unreadable adc sample: {0:?}")]
    Adc(String),
}

pub trait LineSource: Send {
    /// Read the next telemetry line, blocking up to the source's timeout.
    fn read_line(&mut self) -> Result<String, SourceError>;
}

pub trait VoltageSource: Send {
    fn read_voltage(&mut self) -> Result<f64, SourceError>;
}

/// Line source reading the controller's serial port.
pub struct SerialLineSource {
    port: Box<dyn SerialPort>,
}

impl SerialLineSource {
    pub fn open(settings: &SerialSettings) -> Result<Self, SourceError> {
        let port = serialport::new(settings.port.as_str(), settings.baud)
            .timeout(Duration::from_millis(settings.read_timeout_ms))
            .open()?;
        Ok(Self { port })
    }
}

impl LineSource for SerialLineSource {
    fn read_line(&mut self) -> Result<String, SourceError> {
        // The controller writes twice a second; drop whatever queued while
        // the bridge was idle and read a fresh line.
        self.port.clear(serialport::ClearBuffer::Input)?;

        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    buffer.push(byte[0]);
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        // Line noise outside ASCII is dropped rather than failing the
        // cycle; the frame decoder rejects mangled frames anyway.
        buffer.retain(u8::is_ascii);
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Voltage source reading a kernel-exported ADC sample file (IIO sysfs
/// style): raw counts scaled to volts.
pub struct FileVoltageSource {
    path: PathBuf,
    scale: f64,
}

impl FileVoltageSource {
    pub fn new(settings: &AdcSettings) -> Self {
        Self {
            path: PathBuf::from(&settings.value_path),
            scale: settings.scale,
        }
    }
}

impl VoltageSource for FileVoltageSource {
    fn read_voltage(&mut self) -> Result<f64, SourceError> {
        let raw = fs::read_to_string(&self.path)?;
        let counts: f64 = raw
            .trim()
            .parse()
            .map_err(|_| SourceError::Adc(raw.trim().to_string()))?;
        let voltage = counts * self.scale;
        debug!(counts, voltage, "sampled adc");
        Ok(voltage)
    }
}
