pub mod generic_udp;
pub mod ndjson;

use anyhow::Result;
use common::{AppConfig, FrameSink, InputMode, OutputMode, PoseFrame, PoseSource};
use generic_udp::{GenericUdpStrategy, UdpSource};
use ndjson::{NdjsonSink, NdjsonSource};
use std::io::{StdinLock, Stdout};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub enum InputBackend {
    Stdin(NdjsonSource<StdinLock<'static>>),
    Udp(UdpSource),
}

impl PoseSource for InputBackend {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        match self {
            Self::Stdin(s) => s.next_frame(),
            Self::Udp(s) => s.next_frame(),
        }
    }
}

pub enum OutputBackend {
    Stdout(NdjsonSink<Stdout>),
    Udp(GenericUdpStrategy),
}

impl FrameSink for OutputBackend {
    fn initialize(&mut self) -> Result<()> {
        match self {
            Self::Stdout(s) => s.initialize(),
            Self::Udp(s) => s.initialize(),
        }
    }

    fn send(&mut self, frame: &PoseFrame) -> Result<()> {
        match self {
            Self::Stdout(s) => s.send(frame),
            Self::Udp(s) => s.send(frame),
        }
    }
}

pub fn create_source(config: &AppConfig, running: Arc<AtomicBool>) -> Result<InputBackend> {
    match config.input {
        InputMode::Stdin => Ok(InputBackend::Stdin(NdjsonSource::new(std::io::stdin().lock()))),
        InputMode::Udp => Ok(InputBackend::Udp(UdpSource::bind(
            &config.listen_address,
            running,
        )?)),
    }
}

pub fn create_sink(config: &AppConfig) -> OutputBackend {
    match config.output {
        OutputMode::Stdout => OutputBackend::Stdout(NdjsonSink::new(std::io::stdout())),
        OutputMode::Udp => OutputBackend::Udp(GenericUdpStrategy::new(config.send_address.clone())),
    }
}
