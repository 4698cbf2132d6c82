use anyhow::{Context, Result};
use common::{FrameSink, PoseFrame, PoseSource};
use log::{info, warn};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Receives one JSON-encoded frame per datagram.
pub struct UdpSource {
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    buf: Vec<u8>,
}

impl UdpSource {
    pub fn bind(listen_address: &str, running: Arc<AtomicBool>) -> Result<Self> {
        let socket = UdpSocket::bind(listen_address)
            .with_context(|| format!("Failed to bind UDP socket on {}", listen_address))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("Failed to set read timeout")?;
        info!("Listening for pose frames on {}", listen_address);
        Ok(Self {
            socket,
            running,
            buf: vec![0u8; 65535],
        })
    }
}

impl PoseSource for UdpSource {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        while self.running.load(Ordering::SeqCst) {
            let (amt, src) = match self.socket.recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue
                }
                Err(e) => return Err(e).context("Error receiving frame"),
            };

            match serde_json::from_slice::<PoseFrame>(&self.buf[..amt]) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => warn!("Failed to deserialize packet from {}: {}", src, e),
            }
        }
        Ok(None)
    }
}

/// Forwards filtered frames as JSON datagrams.
pub struct GenericUdpStrategy {
    socket: Option<UdpSocket>,
    target_address: String,
}

impl GenericUdpStrategy {
    pub fn new(target_address: String) -> Self {
        Self {
            socket: None,
            target_address,
        }
    }
}

impl FrameSink for GenericUdpStrategy {
    fn initialize(&mut self) -> Result<()> {
        // Bind to 0.0.0.0:0 to let OS pick a port
        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind UDP socket")?;
        socket
            .connect(&self.target_address)
            .with_context(|| format!("Failed to connect to {}", self.target_address))?;
        socket
            .set_nonblocking(true)
            .context("Failed to set non-blocking mode")?;

        self.socket = Some(socket);
        info!("Sending filtered frames to {}", self.target_address);
        Ok(())
    }

    fn send(&mut self, frame: &PoseFrame) -> Result<()> {
        if let Some(socket) = &self.socket {
            let json_data = serde_json::to_vec(frame)?;
            socket.send(&json_data)?;
        }
        Ok(())
    }
}
