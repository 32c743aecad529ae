//! PLC Modbus Demo
//!
//! Runs a fixed read/write cycle against a Modbus TCP server:
//! - FC03 read of registers 0-4
//! - FC16 write of five registers at 15
//! - FC16 write of three floats at 20
//! - FC03 read of three floats at 5
//!
//! Usage: cargo run --features demo --bin demo [server_address] [cycles]
//! Example: RUST_LOG=plc_modbus=info cargo run --features demo --bin demo 192.168.1.5:503 10

use std::time::Duration;

use plc_modbus::{ClientConfig, ModbusClient, ModbusTcpClient};
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{}", plc_modbus::info());

    let mut args = std::env::args().skip(1);
    let server_address = args.next().unwrap_or_else(|| "127.0.0.1:502".to_string());
    let cycles: u32 = match args.next() {
        Some(raw) => raw.parse()?,
        None => 1,
    };

    let config = ClientConfig::from_address(&server_address)?.with_packet_logging(true);
    info!("Connecting to {}...", config.address);
    let mut client = match ModbusTcpClient::connect(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to Modbus server: {}", e);
            return Err(e.into());
        }
    };

    for cycle in 1..=cycles {
        if !client.is_connected() {
            warn!("Connection lost, reconnecting before cycle {}", cycle);
            client = ModbusTcpClient::connect(&config).await?;
        }
        info!("Cycle {}/{}", cycle, cycles);
        let slave_id = client.slave_id();

        match client.read_03(slave_id, 0, 5).await {
            Ok(registers) => info!("Read holding registers: {:?}", registers),
            Err(e) => error!("Failed to read holding registers: {}", e),
        }

        let values = [123, 456, 789, 1011, 1213];
        match client.write_10(slave_id, 15, &values).await {
            Ok(()) => info!("Wrote {} registers at 15", values.len()),
            Err(e) => error!("Failed to write multiple registers: {}", e),
        }

        let floats = [1.23f32, 4.56, 7.89];
        match client.write_10_f32(slave_id, 20, &floats).await {
            Ok(()) => info!("Wrote floats {:?} at 20", floats),
            Err(e) => error!("Failed to write floating-point numbers: {}", e),
        }

        match client.read_03_f32(slave_id, 5, 3).await {
            Ok(read) => info!("Read floating-point numbers: {:?}", read),
            Err(e) => error!("Failed to read floating-point numbers: {}", e),
        }

        if cycle < cycles {
            sleep(Duration::from_millis(500)).await;
        }
    }

    let stats = client.get_stats();
    info!(
        "Requests: {}, responses: {}, errors: {}, timeouts: {}, exceptions: {}",
        stats.requests_sent,
        stats.responses_received,
        stats.errors,
        stats.timeouts,
        stats.exceptions
    );
    info!(
        "Bytes sent: {}, received: {}",
        stats.bytes_sent, stats.bytes_received
    );

    client.close().await?;
    Ok(())
}
