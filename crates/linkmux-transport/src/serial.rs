use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::DEFAULT_BAUD_RATE;
use crate::error::{Result, TransportError};

/// Addressing for a serial channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialParams {
    pub device: PathBuf,
    pub baud_rate: u32,
}

impl SerialParams {
    pub fn new(device: impl AsRef<Path>) -> Self {
        Self {
            device: device.as_ref().to_path_buf(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.device.as_os_str().is_empty() {
            return Err(TransportError::BadParameters(
                "serial device path is empty".to_string(),
            ));
        }
        if speed_for(self.baud_rate).is_none() {
            return Err(TransportError::BadParameters(format!(
                "unsupported baud rate {}",
                self.baud_rate
            )));
        }
        Ok(())
    }
}

/// An open serial device (or any byte-stream device node).
pub struct SerialLink {
    file: File,
    device: PathBuf,
}

impl SerialLink {
    /// Open the device non-blocking without making it the controlling tty.
    ///
    /// Terminals are switched to raw 8N1 at the requested speed; other
    /// device nodes (FIFOs, character devices) are used as-is.
    pub fn open(params: &SerialParams) -> Result<Self> {
        params.validate()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&params.device)
            .map_err(|err| {
                TransportError::socket(format!("failed to open {}", params.device.display()), err)
            })?;

        if file.is_terminal() {
            if let Some(speed) = speed_for(params.baud_rate) {
                configure_raw(file.as_raw_fd(), speed).map_err(|err| {
                    TransportError::socket(
                        format!("failed to configure {}", params.device.display()),
                        err,
                    )
                })?;
            }
        }

        info!(device = ?params.device, baud = params.baud_rate, "serial link opened");

        Ok(Self {
            file,
            device: params.device.clone(),
        })
    }

    /// Read whatever is available (non-blocking).
    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    /// Write `buf`, waiting up to `timeout` for the device to drain when its
    /// output queue is full. Returns the bytes written before giving up.
    pub fn send(&mut self, buf: &[u8], timeout: std::time::Duration) -> io::Result<usize> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.file.write(&buf[offset..]) {
                Ok(0) => break,
                Ok(n) => offset += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if !crate::poller::wait_writable(self.file.as_raw_fd(), timeout)? {
                        break;
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Ok(offset)
    }

    pub fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    pub fn device(&self) -> &Path {
        &self.device
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!(device = ?self.device, "closing serial device");
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device", &self.device)
            .finish()
    }
}

fn speed_for(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

fn configure_raw(fd: RawFd, speed: libc::speed_t) -> io::Result<()> {
    // SAFETY: `termios` is a plain C struct; an all-zero value is a valid
    // initial state and `tcgetattr` overwrites it on success.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by the caller and `tio` is a
    // valid writable termios for the duration of each call.
    unsafe {
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut tio);
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cc[libc::VMIN] = 0;
        tio.c_cc[libc::VTIME] = 0;
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::tcflush(fd, libc::TCIOFLUSH) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
