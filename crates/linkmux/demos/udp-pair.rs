//! Two locators in one process talking to each other over loopback UDP.
//!
//! Run with:
//!   cargo run --example udp-pair
//!
//! To talk to the CLI instead, run in another terminal:
//!   cargo run --features cli -- listen --recv-port 7401 --send-port 7400

use std::time::{Duration, Instant};

use linkmux::transport::Transport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut transport = Transport::new();
    let left = transport.add_udp_locator(7400, 7401)?;
    let right = transport.add_udp_locator(7401, 7400)?;
    eprintln!("left={left} right={right}");

    let mut buf = [0u8; 1024];

    // First receive opens the channel so the port is bound before sending.
    transport.receive_data(&mut buf, right)?;

    for i in 0..3u8 {
        let message = [b'm', b's', b'g', b'0' + i];
        transport.send_data(&message, left)?;

        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if let Some(len) = transport.receive_data(&mut buf, right)? {
                eprintln!("right received {:?}", String::from_utf8_lossy(&buf[..len]));
                break;
            }
        }
    }

    transport.rm_locator(left)?;
    transport.rm_locator(right)?;
    Ok(())
}
