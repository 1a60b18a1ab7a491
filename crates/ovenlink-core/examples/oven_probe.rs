//! Oven Controller Probe
//!
//! A standalone tool to check serial communication with a TTC B2 UpS controller.
//! Reads every register family once and prints the decoded bodies.
//!
//! Usage:
//!   cargo run --example oven_probe -- [OPTIONS]
//!
//! Options:
//!   --port PORT       Serial port (default: /dev/ttyUSB0)
//!   --address ADDR    Controller address (default: 01)
//!   --baud RATE       Baud rate (default: 9600)
//!   --timeout MS      Read/write timeout in ms (default: 1000)
//!   --run             Send RUN after the read-out
//!   --stop            Send STOP after the read-out
//!
//! Set RUST_LOG=ovenlink_core=debug to see every frame.

use anyhow::{bail, Context, Result};
use ovenlink_core::protocol::{
    Address, LineConfig, OperationMode, SerialConnector, Session, Transaction,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name = "/dev/ttyUSB0".to_string();
    let mut address = Address::default();
    let mut config = LineConfig::default();
    let mut operation = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                port_name = value(&args, i, "--port")?.to_string();
            }
            "--address" | "-a" => {
                i += 1;
                address = Address::new(value(&args, i, "--address")?)?;
            }
            "--baud" | "-b" => {
                i += 1;
                config.baud_rate = value(&args, i, "--baud")?
                    .parse()
                    .context("--baud expects a number")?;
            }
            "--timeout" | "-t" => {
                i += 1;
                let ms: u64 = value(&args, i, "--timeout")?
                    .parse()
                    .context("--timeout expects milliseconds")?;
                config.read_timeout_ms = ms;
                config.write_timeout_ms = ms;
            }
            "--run" => operation = Some(OperationMode::Run),
            "--stop" => operation = Some(OperationMode::Stop),
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => bail!("unknown option '{}', try --help", other),
        }
        i += 1;
    }

    let mut session = Session::with_address(SerialConnector::new(port_name), address);
    let port_name = session.connector().port_name().to_string();

    println!("=== Oven Controller Probe ===");
    println!(
        "Port: {}  Address: {}  Baud: {}",
        port_name,
        session.address(),
        config.baud_rate
    );

    session
        .open(&config)
        .with_context(|| format!("opening {}", port_name))?;

    report("analog data", session.analog_data());
    report("digital data", session.digital_data());
    report("remaining steps", session.remaining_steps());
    report("operation setting", session.operation_setting());
    report("step setting", session.step_setting());
    report("repeat setting", session.repeat_setting());
    report("time signal setting", session.time_signal_setting());
    report("const value setting", session.const_value_setting());
    report("PID zone setting", session.pid_zone_setting());
    report("PID parameter setting", session.pid_parameter_setting());
    report("ON/OFF system setting", session.on_off_system_setting());

    if let Some(mode) = operation {
        let tx = session.set_operation_mode(mode);
        println!("{:?}: {}", mode, tx.status());
    }

    let counters = session.counters();
    println!(
        "\n{} frames sent ({} bytes), {} received ({} bytes)",
        counters.tx_frames, counters.tx_bytes, counters.rx_frames, counters.rx_bytes
    );

    session.close()?;
    Ok(())
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .with_context(|| format!("{} expects a value", flag))
}

fn report(name: &str, tx: Transaction<String>) {
    match tx.value() {
        Some(body) => println!("{:<22} {}", name, body),
        None => println!(
            "{:<22} FAILED: {} (tx={:?} rx={:?})",
            name,
            tx.status(),
            tx.request(),
            tx.response()
        ),
    }
}

fn print_help() {
    println!("Oven Controller Probe");
    println!();
    println!("Usage: oven_probe [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port, -p PORT       Serial port (default: /dev/ttyUSB0)");
    println!("  --address, -a ADDR    Controller address (default: 01)");
    println!("  --baud, -b RATE       Baud rate (default: 9600)");
    println!("  --timeout, -t MS      Read/write timeout in ms (default: 1000)");
    println!("  --run                 Send RUN after the read-out");
    println!("  --stop                Send STOP after the read-out");
    println!("  --help, -h            Show this help");
}
