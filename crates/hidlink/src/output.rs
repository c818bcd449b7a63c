use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hidlink_frame::{channel_name, INPUT};
use hidlink_session::{DeviceEvent, DeviceRecord, StateKind};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DeviceOutput {
    id: u32,
    address: String,
    state: StateKind,
    event: DeviceEvent,
}

impl DeviceOutput {
    fn from_record(record: &DeviceRecord) -> Self {
        Self {
            id: record.id(),
            address: record.address().to_string(),
            state: record.state(),
            event: record.event(),
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    device_id: u32,
    address: String,
    channel: &'a str,
    size: usize,
    data: String,
    timestamp: String,
}

/// Print the found records (unfound slots are skipped).
pub fn print_devices(records: &[DeviceRecord], format: OutputFormat) {
    let devices: Vec<DeviceOutput> = records
        .iter()
        .filter(|r| r.is_found())
        .map(DeviceOutput::from_record)
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&devices).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "ADDRESS", "STATE", "EVENT"]);
            for d in &devices {
                table.add_row(vec![
                    d.id.to_string(),
                    d.address.clone(),
                    d.state.to_string(),
                    d.event.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if devices.is_empty() {
                println!("no devices found");
            }
            for d in &devices {
                println!("device {} {} ({})", d.id, d.address, d.state);
            }
        }
        OutputFormat::Raw => {
            for d in &devices {
                println!("{}", d.address);
            }
        }
    }
}

/// Print the frame currently held in `record`'s receive buffer.
pub fn print_frame(record: &DeviceRecord, format: OutputFormat) {
    let data = record.received();
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                device_id: record.id(),
                address: record.address().to_string(),
                channel: channel_name(INPUT),
                size: data.len(),
                data: hex(data),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "ADDRESS", "SIZE", "DATA"])
                .add_row(vec![
                    record.id().to_string(),
                    record.address().to_string(),
                    data.len().to_string(),
                    hex(data),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "device={} address={} size={} data={}",
                record.id(),
                record.address(),
                data.len(),
                hex(data)
            );
        }
        OutputFormat::Raw => {
            print_raw(data);
        }
    }
}

/// Report that a record lost its session.
pub fn print_disconnect(record: &DeviceRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DeviceOutput::from_record(record);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "device {} {} disconnected ({})",
                record.id(),
                record.address(),
                record.event()
            );
        }
        // Keep raw output a pure byte stream.
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Space-separated uppercase hex.
pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
