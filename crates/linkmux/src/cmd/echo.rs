use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cmd::{install_ctrlc_handler, EchoArgs, Endpoint};
use crate::exit::{transport_error, CliResult, SUCCESS};

pub fn run(args: EchoArgs) -> CliResult<i32> {
    let mut endpoint = Endpoint::open(&args.link)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut echoed = 0usize;

    while running.load(Ordering::SeqCst) {
        let Some(len) = endpoint.poll_message()? else {
            continue;
        };

        tracing::info!(locator = %endpoint.id, size = len, "echoing message");
        endpoint
            .transport
            .send_data(&endpoint.buf[..len], endpoint.id)
            .map_err(|err| transport_error("echo send failed", err))?;
        echoed = echoed.saturating_add(1);

        if args.count.is_some_and(|count| echoed >= count) {
            break;
        }
    }

    Ok(SUCCESS)
}
