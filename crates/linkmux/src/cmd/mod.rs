use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use linkmux_transport::{
    LinkParams, LocatorId, SerialParams, Transport, UdpParams, DEFAULT_BAUD_RATE,
    DEFAULT_REMOTE_ADDR,
};

use crate::exit::{transport_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::{Origin, OutputFormat};

pub mod echo;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Echo every received message back over the same link.
    Echo(EchoArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Listen and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Link selection shared by every I/O subcommand.
///
/// `--device` selects the serial backend; otherwise both UDP ports are
/// required.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device path.
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with_all = ["recv_port", "send_port", "local_send_port"]
    )]
    pub device: Option<PathBuf>,
    /// Serial baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Local UDP port to receive on.
    #[arg(long, value_name = "PORT")]
    pub recv_port: Option<u16>,
    /// Remote UDP port to send to.
    #[arg(long, value_name = "PORT")]
    pub send_port: Option<u16>,
    /// Remote IP address.
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_REMOTE_ADDR)]
    pub remote: String,
    /// Local UDP port to send from. Default: ephemeral.
    #[arg(long, value_name = "PORT")]
    pub local_send_port: Option<u16>,
    /// How long one receive may wait for input (e.g. 20ms, 1s).
    #[arg(long, default_value = "20ms")]
    pub poll_timeout: String,
}

impl LinkArgs {
    pub fn params(&self) -> CliResult<LinkParams> {
        if let Some(device) = &self.device {
            return Ok(SerialParams::new(device).with_baud_rate(self.baud).into());
        }

        match (self.recv_port, self.send_port) {
            (Some(recv_port), Some(send_port)) => {
                let mut params =
                    UdpParams::new(recv_port, send_port).with_remote(self.remote.clone(), send_port);
                if let Some(port) = self.local_send_port {
                    params = params.with_local_send_port(port);
                }
                Ok(params.into())
            }
            _ => Err(CliError::new(
                USAGE,
                "either --device or both --recv-port and --send-port are required",
            )),
        }
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after echoing N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload (e.g. 010203).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    /// Wait for one response message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// An opened locator plus a receive buffer large enough for any frame
/// the channel can reassemble.
pub struct Endpoint {
    pub transport: Transport,
    pub id: LocatorId,
    pub buf: Vec<u8>,
}

impl Endpoint {
    /// Register the link described by `link` and open it now, so a
    /// listener binds before anything is sent to it.
    pub fn open(link: &LinkArgs) -> CliResult<Self> {
        let poll_timeout = parse_duration(&link.poll_timeout)?;
        let mut transport = Transport::new();

        let id = match link.params()? {
            LinkParams::Serial(params) => transport.add_serial_locator_with(params),
            LinkParams::Udp(params) => transport.add_udp_locator_with(params),
        }
        .map_err(|err| transport_error("add locator failed", err))?;

        transport
            .set_poll_timeout(id, poll_timeout)
            .map_err(|err| transport_error("configure failed", err))?;
        transport
            .registry_mut()
            .open(id)
            .map_err(|err| transport_error("open failed", err))?;

        let capacity = transport
            .registry()
            .get(id)
            .map(|channel| channel.rx_capacity())
            .unwrap_or(linkmux_transport::RX_BUFFER_LENGTH);

        Ok(Self {
            transport,
            id,
            buf: vec![0u8; capacity],
        })
    }

    /// One bounded receive attempt. A message lands in `buf[..len]`.
    pub fn poll_message(&mut self) -> CliResult<Option<usize>> {
        self.transport
            .receive_data(&mut self.buf, self.id)
            .map_err(|err| transport_error("receive failed", err))
    }

    pub fn origin(&self) -> Origin {
        let channel = self.transport.registry().get(self.id);
        Origin {
            locator: self.id,
            kind: channel.map_or(linkmux_transport::ChannelKind::Udp, |c| c.kind()),
            peer: channel.and_then(|c| c.peer_addr()),
        }
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> LinkArgs {
        LinkArgs {
            device: None,
            baud: DEFAULT_BAUD_RATE,
            recv_port: None,
            send_port: None,
            remote: DEFAULT_REMOTE_ADDR.to_string(),
            local_send_port: None,
            poll_timeout: "20ms".to_string(),
        }
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn params_require_a_link() {
        let err = link().params().unwrap_err();
        assert_eq!(err.code, USAGE);

        let mut half = link();
        half.recv_port = Some(7400);
        assert!(half.params().is_err());
    }

    #[test]
    fn params_build_udp_with_remote() {
        let mut args = link();
        args.recv_port = Some(7400);
        args.send_port = Some(7401);
        args.remote = "10.0.0.2".to_string();
        args.local_send_port = Some(7402);

        match args.params().unwrap() {
            LinkParams::Udp(params) => {
                assert_eq!(params.local_recv_port, 7400);
                assert_eq!(params.remote_port, 7401);
                assert_eq!(params.remote_addr, "10.0.0.2");
                assert_eq!(params.local_send_port, 7402);
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn params_build_serial() {
        let mut args = link();
        args.device = Some(PathBuf::from("/dev/ttyUSB0"));
        args.baud = 9600;

        match args.params().unwrap() {
            LinkParams::Serial(params) => {
                assert_eq!(params.device, PathBuf::from("/dev/ttyUSB0"));
                assert_eq!(params.baud_rate, 9600);
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }
}
