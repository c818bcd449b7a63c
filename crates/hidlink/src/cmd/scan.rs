use hidlink_session::Scanner;
use tracing::info;

use crate::backend;
use crate::cmd::{Context, ScanArgs};
use crate::config;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::print_devices;

pub fn run(args: ScanArgs, ctx: &Context) -> CliResult<i32> {
    if args.capacity == 0 {
        return Err(CliError::new(USAGE, "--capacity must be at least 1"));
    }
    let cfg = config::load(ctx.config.as_deref())?;
    let backend = backend::open(ctx.adapter)?;

    let mut records = cfg.session.records(args.capacity);
    let scanner = Scanner::with_config(backend.radio.as_ref(), cfg.scan);
    let found = scanner.discover(&mut records, args.rounds);
    info!(found, rounds = args.rounds, "scan finished");

    print_devices(&records, ctx.format);
    Ok(SUCCESS)
}
