use anyhow::Result;

use crate::PoseFrame;

/// Producer side of the pipeline (detector, replay file, network feed).
pub trait PoseSource {
    /// Blocks until the next frame is available. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<PoseFrame>>;
}

/// Consumer side of the pipeline (renderer, analysis, network forwarder).
pub trait FrameSink {
    fn initialize(&mut self) -> Result<()>;
    fn send(&mut self, frame: &PoseFrame) -> Result<()>;
}
