//! USB module - handles run commands and report output over CDC serial
//!
//! Protocol (one command per line):
//! - `RUN` runs the pipeline with a fresh TRNG seed
//! - `RUN <64 hex chars>` runs it with the given seed
//!
//! The reply is the text report, terminated by its `end` line.

use kyber_noise::command::{Command, CommandReader};
use rtt_target::rprintln;
use usb_device::bus::UsbBus;
use usb_device::device::UsbDevice;
use usb_device::UsbError;
use usbd_serial::SerialPort;

/// USB command handler for receiving commands and sending reports
pub struct UsbCommandHandler {
    reader: CommandReader,
}

impl UsbCommandHandler {
    /// Create a new USB command handler
    pub fn new() -> Self {
        Self {
            reader: CommandReader::new(),
        }
    }

    /// Queue whatever the host has sent since the last call
    pub fn receive<B: UsbBus>(&mut self, serial: &mut SerialPort<'_, B>) {
        let mut buf = [0u8; 64];
        if let Ok(count) = serial.read(&mut buf) {
            self.reader.push(&buf[..count]);
        }
    }

    /// Whether received bytes are still waiting to be parsed
    pub fn has_pending(&self) -> bool {
        self.reader.has_pending()
    }

    /// Next valid command, if a complete one has arrived.
    /// Invalid lines are logged and skipped; later commands stay queued.
    pub fn next_command(&mut self) -> Option<Command> {
        while let Some(parsed) = self.reader.next_command() {
            match parsed {
                Ok(command) => return Some(command),
                Err(err) => rprintln!("ERROR: {}", err),
            }
        }
        None
    }

    /// Send a rendered report, polling the device until every byte is queued
    pub fn send_report<B: UsbBus>(
        &self,
        usb_dev: &mut UsbDevice<'_, B>,
        serial: &mut SerialPort<'_, B>,
        report: &[u8],
    ) {
        rprintln!("Sending report ({} bytes)...", report.len());
        let mut sent = 0;
        while sent < report.len() {
            match serial.write(&report[sent..]) {
                Ok(count) => sent += count,
                Err(UsbError::WouldBlock) => {}
                Err(_) => {
                    rprintln!("ERROR: USB write failed, report truncated");
                    return;
                }
            }
            usb_dev.poll(&mut [&mut *serial]);
        }
        rprintln!("Report sent via USB");
    }
}
