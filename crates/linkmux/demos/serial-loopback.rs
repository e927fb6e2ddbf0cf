//! Send framed messages through a serial device and read them back.
//!
//! Needs a device that loops TX to RX: a jumpered USB adapter, or one end
//! of a `socat -d -d pty,raw,echo=0 pty,raw,echo=0` pair with the other end
//! echoing.
//!
//! Run with:
//!   cargo run --example serial-loopback -- /dev/ttyUSB0 115200

use std::time::{Duration, Instant};

use linkmux::transport::{SerialParams, Transport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let device = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let baud: u32 = match args.next() {
        Some(text) => text.parse()?,
        None => linkmux::transport::DEFAULT_BAUD_RATE,
    };

    let mut transport = Transport::new();
    let id = transport.add_serial_locator_with(SerialParams::new(&device).with_baud_rate(baud))?;
    eprintln!("opened {device} at {baud} baud as locator {id}");

    transport.send_data(b"loopback check", id)?;

    let mut buf = [0u8; 1024];
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if let Some(len) = transport.receive_data(&mut buf, id)? {
            eprintln!("received {:?}", String::from_utf8_lossy(&buf[..len]));
            return Ok(());
        }
    }

    eprintln!("nothing came back within 2s");
    Ok(())
}
