use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hidlink_session::{disconnect, poll, Connector, DeviceRecord, PollOutcome, Scanner};
use hidlink_transport::{BdAddr, ChannelTransport};
use tracing::{debug, info, warn};

use crate::backend;
use crate::cmd::{parse_duration, Context, ListenArgs};
use crate::config;
use crate::exit::{transport_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_disconnect, print_frame, OutputFormat};

pub fn run(args: ListenArgs, ctx: &Context) -> CliResult<i32> {
    let mut cfg = config::load(ctx.config.as_deref())?;
    if let Some(timeout) = &args.poll_timeout {
        cfg.session.poll_timeout_ms = parse_duration(timeout)?.as_millis() as u64;
    }
    let addresses = parse_addresses(&args.addresses)?;
    if addresses.is_empty() && args.capacity == 0 {
        return Err(CliError::new(USAGE, "--capacity must be at least 1"));
    }

    let backend = backend::open(ctx.adapter)?;
    let connector = Connector::with_config(backend.transport.as_ref(), cfg.session.clone());

    let mut records = if addresses.is_empty() {
        let mut records = cfg.session.records(args.capacity);
        let scanner = Scanner::with_config(backend.radio.as_ref(), cfg.scan.clone());
        if scanner.discover(&mut records, args.rounds) == 0 {
            return Err(CliError::new(FAILURE, "no devices found"));
        }
        connector.connect_all(&mut records);
        records
    } else {
        connect_addresses(&connector, &cfg.session, &addresses)
    };

    if !records.iter().any(DeviceRecord::is_connected) {
        return Err(CliError::new(FAILURE, "no device could be connected"));
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let result = listen_loop(&mut records, &running, args.count, ctx.format);
    for record in &mut records {
        disconnect(record);
    }
    result
}

fn parse_addresses(raw: &[String]) -> CliResult<Vec<BdAddr>> {
    raw.iter()
        .map(|s| {
            s.parse::<BdAddr>()
                .map_err(|err| transport_error("invalid address", err))
        })
        .collect()
}

fn connect_addresses<T: ChannelTransport>(
    connector: &Connector<T>,
    session: &hidlink_session::SessionConfig,
    addresses: &[BdAddr],
) -> Vec<DeviceRecord> {
    let mut records = session.records(addresses.len());
    for (record, address) in records.iter_mut().zip(addresses) {
        if let Err(err) = connector.connect_address(record, *address) {
            warn!(%address, error = %err, "connect failed");
        }
    }
    records
}

fn listen_loop(
    records: &mut [DeviceRecord],
    running: &AtomicBool,
    count: Option<usize>,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let mut live = 0usize;
        for record in records.iter_mut().filter(|r| r.is_connected()) {
            live += 1;
            match poll(record) {
                PollOutcome::Frame(_) => {
                    print_frame(record, format);
                    printed = printed.saturating_add(1);
                    if count.is_some_and(|count| printed >= count) {
                        return Ok(SUCCESS);
                    }
                }
                outcome if outcome.is_disconnect() => {
                    info!(id = record.id(), event = %record.event(), "device dropped");
                    print_disconnect(record, format);
                }
                PollOutcome::Error(kind) => debug!(id = record.id(), ?kind, "transient read error"),
                _ => {}
            }
        }
        if live == 0 {
            return Err(CliError::new(FAILURE, "all devices disconnected"));
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
