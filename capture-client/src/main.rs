use anyhow::{Context, Result};
use clap::Parser;
use kyber_noise::cbd::{CbdSampler, Sampler};
use kyber_noise::command::Command;
use kyber_noise::prf::{Expander, Shake256Prf};
use kyber_noise::report::{parse_report, ParsedReport};
use kyber_noise::seed::Seed;
use serialport::SerialPort;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Capture client for the STM32 Kyber noise harness
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port path (e.g., /dev/ttyACM0 on Linux, COM3 on Windows)
    #[arg(short, long)]
    port: Option<String>,

    /// List available serial ports
    #[arg(short, long)]
    list: bool,

    /// Timeout in seconds per run
    #[arg(short, long, default_value = "30")]
    timeout: u64,

    /// Number of runs to request
    #[arg(short, long, default_value = "1")]
    runs: u32,

    /// Ask the device to use this seed (64 hex chars) instead of its TRNG
    #[arg(short, long)]
    seed: Option<String>,

    /// Append every raw report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Recompute each polynomial on the host and compare with the device
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // List ports if requested
    if args.list {
        list_ports()?;
        return Ok(());
    }

    // reject bad seeds here rather than on the device
    let seed = match &args.seed {
        Some(hex) => Some(Seed::from_hex(hex).context("Invalid --seed")?),
        None => None,
    };
    let command = format!("{}\n", Command::Run(seed));

    // Get port path
    let port_path = if let Some(path) = args.port.clone() {
        path
    } else {
        // Try to auto-detect STM32 device
        find_stm32_port()?
    };

    println!("🔌 Connecting to STM32 on {}...", port_path);

    let mut port = serialport::new(&port_path, 115200)
        .timeout(Duration::from_secs(args.timeout))
        .open()
        .context("Failed to open serial port")?;

    println!("✅ Connected!");

    let mut capture = match &args.output {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => None,
    };

    let mut mismatches = 0usize;
    for run in 1..=args.runs {
        println!("📤 Requesting run {}/{}", run, args.runs);
        port.write_all(command.as_bytes())
            .context("Failed to write to serial port")?;
        port.flush().context("Failed to flush serial port")?;

        let raw = read_report(&mut port, args.timeout)?;
        if let Some(file) = capture.as_mut() {
            file.write_all(raw.as_bytes())
                .context("Failed to append report")?;
        }

        let report = parse_report(&raw).context("Device sent a malformed report")?;
        print_report(&report);

        if let Some(failure) = &report.failure {
            println!("⚠️  Run failed at term {}: {}", failure.term, failure.error);
        }

        if args.verify {
            mismatches += verify_report(&report)?;
        }
    }

    if args.verify {
        if mismatches > 0 {
            anyhow::bail!("{} polynomial(s) differ from the host computation", mismatches);
        }
        println!("\n✅ All polynomials match the host computation");
    }

    Ok(())
}

fn print_report(report: &ParsedReport) {
    println!("\n📥 Seed: {}", report.seed);
    for timing in &report.timings {
        println!(
            "  {:<3} nonce={} eta={}  {:>6} us  [{} .. {}]",
            timing.name,
            timing.nonce,
            timing.width,
            timing.elapsed_us,
            timing.start_us,
            timing.end_us
        );
    }
    if let Some(total) = report.total_us {
        let measured: u64 = report.timings.iter().map(|t| t.elapsed_us).sum();
        println!("  total {} us ({} us inside trigger windows)", total, measured);
    }
}

/// Recompute every reported term from the seed. Returns the number of mismatches.
fn verify_report(report: &ParsedReport) -> Result<usize> {
    let mut mismatches = 0;
    for timing in &report.timings {
        let mut buffer = vec![0u8; timing.width as usize * kyber_noise::N / 4];
        Shake256Prf
            .expand(&report.seed, timing.nonce, &mut buffer)
            .context("Host expansion failed")?;
        let expected = CbdSampler
            .sample(&buffer, timing.width)
            .with_context(|| format!("Host cannot sample term {}", timing.name))?;

        match report.polynomial(&timing.name) {
            Some(poly) if poly.coeffs[..] == expected.coeffs()[..] => {
                log::debug!("term {} matches", timing.name);
            }
            Some(_) => {
                println!("❌ term {} differs from host computation", timing.name);
                mismatches += 1;
            }
            None => {
                println!("❌ term {} has timing but no polynomial", timing.name);
                mismatches += 1;
            }
        }
    }
    Ok(mismatches)
}

fn list_ports() -> Result<()> {
    println!("📋 Available serial ports:");
    let ports = serialport::available_ports().context("Failed to list serial ports")?;

    if ports.is_empty() {
        println!("  No serial ports found");
        return Ok(());
    }

    for port in ports {
        println!(
            "  • {} - {}",
            port.port_name,
            port_type_name(&port.port_type)
        );
    }

    Ok(())
}

fn port_type_name(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => {
            format!("USB (VID: {:04x}, PID: {:04x})", info.vid, info.pid)
        }
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::Unknown => "Unknown".to_string(),
    }
}

fn find_stm32_port() -> Result<String> {
    let ports = serialport::available_ports().context("Failed to list serial ports")?;

    // Look for STM32 VID (0x0483)
    for port in &ports {
        if let serialport::SerialPortType::UsbPort(info) = &port.port_type {
            if info.vid == 0x0483 {
                println!("🔍 Auto-detected STM32 device: {}", port.port_name);
                return Ok(port.port_name.clone());
            }
        }
    }

    // If no STM32 found, try to use the first available port
    if let Some(port) = ports.first() {
        println!(
            "⚠️  No STM32 device found, using first available port: {}",
            port.port_name
        );
        return Ok(port.port_name.clone());
    }

    anyhow::bail!("No serial ports found. Please specify port with --port option");
}

/// Read one report, i.e. everything up to and including the `end` line.
fn read_report(port: &mut Box<dyn SerialPort>, timeout_secs: u64) -> Result<String> {
    let mut response = String::new();
    let mut buffer = [0u8; 1024];
    let start = std::time::Instant::now();
    let timeout = Duration::from_secs(timeout_secs);

    loop {
        if start.elapsed() > timeout {
            anyhow::bail!("Timeout waiting for report from STM32");
        }

        match port.read(&mut buffer) {
            Ok(n) if n > 0 => {
                response.push_str(&String::from_utf8_lossy(&buffer[..n]));
                if let Some(end) = find_end(&response) {
                    response.truncate(end);
                    break;
                }
            }
            Ok(_) => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                return Err(e).context("Error reading from serial port");
            }
        }
    }

    Ok(response)
}

/// Byte offset just past the first complete `end` line.
fn find_end(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.ends_with('\n') && line.trim() == "end" {
            return Some(offset);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_end_waits_for_newline() {
        assert_eq!(find_end("AB\ntotal elapsed_us=1\nen"), None);
        assert_eq!(find_end("AB\nend"), None);
        assert_eq!(find_end("AB\nend\nnext"), Some(7));
    }

    #[test]
    fn test_end_inside_coefficients_ignored() {
        assert_eq!(find_end("poly s\n1 2 end\n"), None);
    }
}
