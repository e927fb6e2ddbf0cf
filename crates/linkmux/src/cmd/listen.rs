use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cmd::{install_ctrlc_handler, Endpoint, ListenArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut endpoint = Endpoint::open(&args.link)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let Some(len) = endpoint.poll_message()? else {
            continue;
        };

        let origin = endpoint.origin();
        print_message(&endpoint.buf[..len], &origin, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}
