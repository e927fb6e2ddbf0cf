use std::fs;
use std::time::{Duration, Instant};

use crate::cmd::{parse_duration, Endpoint, SendArgs};
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;
    let mut endpoint = Endpoint::open(&args.link)?;

    let sent = endpoint
        .transport
        .send_data(&payload, endpoint.id)
        .map_err(|err| transport_error("send failed", err))?;
    tracing::info!(locator = %endpoint.id, bytes = sent, "message sent");

    if args.wait {
        let len = wait_for_message(&mut endpoint, wait_timeout)?;
        let origin = endpoint.origin();
        print_message(&endpoint.buf[..len], &origin, format);
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), &err)
        });
    }
    Ok(Vec::new())
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "--hex needs an even number of digits"));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::new(USAGE, format!("--hex is not valid hex: {input}")))
        })
        .collect()
}

trait MessageSource {
    fn next_message(&mut self) -> CliResult<Option<usize>>;
}

impl MessageSource for Endpoint {
    fn next_message(&mut self) -> CliResult<Option<usize>> {
        self.poll_message()
    }
}

/// Poll until one message arrives or `timeout` elapses.
fn wait_for_message<S: MessageSource>(source: &mut S, timeout: Duration) -> CliResult<usize> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(len) = source.next_message()? {
            return Ok(len);
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("no response within {}ms", timeout.as_millis()),
            ));
        }
    }
}
