use linkmux_frame::{HEADER_SIZE, MAX_PAYLOAD, WIRE_VERSION};
use linkmux_transport::{DEFAULT_POLL_TIMEOUT, MAX_NUM_CHANNELS, RX_BUFFER_LENGTH};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("linkmux {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: linkmux");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("LINKMUX_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("wire_version: {WIRE_VERSION} (header {HEADER_SIZE} bytes, max payload {MAX_PAYLOAD})");
    println!(
        "limits: channels={MAX_NUM_CHANNELS}, rx_buffer={RX_BUFFER_LENGTH}, poll_timeout={}ms",
        DEFAULT_POLL_TIMEOUT.as_millis()
    );

    Ok(SUCCESS)
}
