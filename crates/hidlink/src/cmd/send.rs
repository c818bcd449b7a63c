use std::time::{Duration, Instant};

use hidlink_session::{poll, send, Connector, DeviceRecord, PollOutcome};
use hidlink_transport::BdAddr;
use tracing::info;

use crate::backend;
use crate::cmd::{parse_duration, Context, SendArgs};
use crate::config;
use crate::exit::{
    frame_error, session_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT,
    USAGE,
};
use crate::output::print_frame;

pub fn run(args: SendArgs, ctx: &Context) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let frame = parse_hex(&args.data)?;
    hidlink_frame::validate(&frame).map_err(|err| frame_error("invalid frame", err))?;
    let address: BdAddr = args
        .address
        .parse()
        .map_err(|err| transport_error("invalid address", err))?;

    let cfg = config::load(ctx.config.as_deref())?;
    let backend = backend::open(ctx.adapter)?;
    let connector = Connector::with_config(backend.transport.as_ref(), cfg.session.clone());

    let mut record = cfg
        .session
        .records(1)
        .pop()
        .ok_or_else(|| CliError::new(FAILURE, "no device record"))?;
    connector
        .connect_address(&mut record, address)
        .map_err(|err| session_error("connect failed", err))?;

    let sent = send(&mut record, &frame).map_err(|err| session_error("send failed", err))?;
    info!(%address, bytes = sent, "frame sent");

    if args.wait {
        wait_for_frame(&mut record, wait_timeout)?;
        print_frame(&record, ctx.format);
    }

    record.disconnect();
    Ok(SUCCESS)
}

fn wait_for_frame(record: &mut DeviceRecord, timeout: Duration) -> CliResult<()> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match poll(record) {
            PollOutcome::Frame(_) => return Ok(()),
            outcome if outcome.is_disconnect() => {
                return Err(CliError::new(
                    FAILURE,
                    format!("device disconnected while waiting ({})", record.event()),
                ))
            }
            _ => {}
        }
    }
    Err(CliError::new(
        TIMEOUT,
        format!("no frame received within {timeout:?}"),
    ))
}

/// Parse hex bytes, with or without separators (space, `:`, `-`, `,`) and
/// optional `0x` prefixes.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let invalid = || CliError::new(USAGE, format!("--data is not valid hex: {input:?}"));

    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ',')) {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.len() % 2 != 0 {
            return Err(invalid());
        }
        digits.push_str(token);
    }
    if digits.is_empty() {
        return Err(invalid());
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(invalid)
        })
        .collect()
}
