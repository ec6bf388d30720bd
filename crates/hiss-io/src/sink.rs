//! Audio sink abstraction.
//!
//! A sink is whatever consumes rendered blocks: a sound card, a file, or a
//! test buffer. The render thread drives it with a pull loop:
//!
//! ```text
//! open ─► next_request ─► Frames(n) ─► render ─► write_block ─┐
//!              ▲                                              │
//!              └───────────── Idle (poll again) ◄─────────────┘
//!                             Finished ─► close
//! ```
//!
//! [`AudioSink::next_request`] takes a timeout so the render thread can
//! observe a stop request even when the device stops asking for audio.

use crate::{Error, Result};
use hiss_config::RenderSettings;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What a sink wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRequest {
    /// Render this many frames and pass them to [`AudioSink::write_block`].
    Frames(usize),
    /// Nothing needed yet; ask again.
    Idle,
    /// The sink will not accept more audio.
    Finished,
}

/// Destination for rendered mono blocks.
///
/// Sinks are moved onto the render thread, so they must be `Send`. All
/// methods are called from that thread only.
pub trait AudioSink: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Acquire the underlying resource. Called once per render run.
    fn open(&mut self, settings: &RenderSettings) -> Result<()>;

    /// Wait up to `timeout` for the sink to ask for a block.
    fn next_request(&mut self, timeout: Duration) -> Result<BlockRequest>;

    /// Accept a rendered block of the length last requested.
    fn write_block(&mut self, block: &[f32]) -> Result<()>;

    /// Release the underlying resource. Called once per run, after `open`
    /// succeeded, whether the run ended normally or not.
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Default)]
struct CaptureState {
    samples: Vec<f32>,
    blocks: u64,
    opened: u32,
    closed: u32,
}

/// Shared view of what a [`MemorySink`] received.
#[derive(Debug, Clone, Default)]
pub struct MemoryCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl MemoryCapture {
    /// Copy of every sample written so far.
    pub fn samples(&self) -> Vec<f32> {
        self.state.lock().samples.clone()
    }

    /// Number of blocks written.
    pub fn blocks(&self) -> u64 {
        self.state.lock().blocks
    }

    /// How many times the sink was opened.
    pub fn open_count(&self) -> u32 {
        self.state.lock().opened
    }

    /// How many times the sink was closed.
    pub fn close_count(&self) -> u32 {
        self.state.lock().closed
    }
}

/// In-memory sink for offline rendering and tests.
///
/// Finite sinks ask for `limit` frames in blocks of the configured size and
/// then report [`BlockRequest::Finished`]. A realtime sink never finishes and
/// asks for one block per block period, like a sound card would.
///
/// # Example
///
/// ```rust
/// use hiss_config::RenderSettings;
/// use hiss_io::{AudioSink, BlockRequest, MemorySink};
/// use std::time::Duration;
///
/// let mut sink = MemorySink::new(5000);
/// sink.open(&RenderSettings { block_size: 2048, ..Default::default() }).unwrap();
///
/// let mut sizes = Vec::new();
/// while let BlockRequest::Frames(n) = sink.next_request(Duration::ZERO).unwrap() {
///     sink.write_block(&vec![0.0; n]).unwrap();
///     sizes.push(n);
/// }
/// assert_eq!(sizes, [2048, 2048, 904]);
/// ```
#[derive(Debug)]
pub struct MemorySink {
    limit: Option<u64>,
    paced: bool,
    fail_after: Option<u64>,
    block_size: usize,
    period: Duration,
    written: u64,
    blocks: u64,
    next_due: Option<Instant>,
    capture: MemoryCapture,
}

impl MemorySink {
    /// Sink that accepts exactly `frames` frames as fast as they are rendered.
    pub fn new(frames: u64) -> Self {
        Self::build(Some(frames), false)
    }

    /// Endless sink that requests one block per block period.
    pub fn realtime() -> Self {
        Self::build(None, true)
    }

    fn build(limit: Option<u64>, paced: bool) -> Self {
        Self {
            limit,
            paced,
            fail_after: None,
            block_size: RenderSettings::default().block_size,
            period: Duration::ZERO,
            written: 0,
            blocks: 0,
            next_due: None,
            capture: MemoryCapture::default(),
        }
    }

    /// Fail with a stream error when asked for block number `blocks + 1`.
    pub fn fail_after(mut self, blocks: u64) -> Self {
        self.fail_after = Some(blocks);
        self
    }

    /// Handle for inspecting the captured audio after the sink has moved.
    pub fn capture(&self) -> MemoryCapture {
        self.capture.clone()
    }
}

impl AudioSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&mut self, settings: &RenderSettings) -> Result<()> {
        self.block_size = settings.block_size;
        self.period = settings.block_duration();
        self.written = 0;
        self.blocks = 0;
        self.next_due = None;
        self.capture.state.lock().opened += 1;
        Ok(())
    }

    fn next_request(&mut self, timeout: Duration) -> Result<BlockRequest> {
        if let Some(limit) = self.fail_after
            && self.blocks >= limit
        {
            return Err(Error::Stream(format!(
                "memory sink failed after {limit} blocks"
            )));
        }

        let frames = match self.limit {
            Some(limit) if self.written >= limit => return Ok(BlockRequest::Finished),
            Some(limit) => (limit - self.written).min(self.block_size as u64) as usize,
            None => self.block_size,
        };

        if self.paced {
            let now = Instant::now();
            let due = *self.next_due.get_or_insert(now);
            if due > now {
                let wait = due - now;
                if wait > timeout {
                    std::thread::sleep(timeout);
                    return Ok(BlockRequest::Idle);
                }
                std::thread::sleep(wait);
            }
            self.next_due = Some(due + self.period);
        }

        Ok(BlockRequest::Frames(frames))
    }

    fn write_block(&mut self, block: &[f32]) -> Result<()> {
        self.written += block.len() as u64;
        self.blocks += 1;
        let mut state = self.capture.state.lock();
        state.samples.extend_from_slice(block);
        state.blocks += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.capture.state.lock().closed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(block_size: usize) -> RenderSettings {
        RenderSettings {
            block_size,
            ..RenderSettings::default()
        }
    }

    #[test]
    fn test_finite_sink_splits_last_block() {
        let mut sink = MemorySink::new(10);
        sink.open(&settings(4)).unwrap();

        let mut sizes = Vec::new();
        loop {
            match sink.next_request(Duration::ZERO).unwrap() {
                BlockRequest::Frames(n) => {
                    sink.write_block(&vec![0.5; n]).unwrap();
                    sizes.push(n);
                }
                BlockRequest::Finished => break,
                BlockRequest::Idle => unreachable!("finite sinks are never idle"),
            }
        }
        sink.close().unwrap();

        assert_eq!(sizes, [4, 4, 2]);
        let capture = sink.capture();
        assert_eq!(capture.samples(), vec![0.5; 10]);
        assert_eq!(capture.blocks(), 3);
        assert_eq!(capture.open_count(), 1);
        assert_eq!(capture.close_count(), 1);
    }

    #[test]
    fn test_zero_frames_finishes_immediately() {
        let mut sink = MemorySink::new(0);
        sink.open(&settings(64)).unwrap();
        assert_eq!(
            sink.next_request(Duration::ZERO).unwrap(),
            BlockRequest::Finished
        );
    }

    #[test]
    fn test_scripted_failure() {
        let mut sink = MemorySink::new(1000).fail_after(2);
        sink.open(&settings(100)).unwrap();
        for _ in 0..2 {
            assert_eq!(
                sink.next_request(Duration::ZERO).unwrap(),
                BlockRequest::Frames(100)
            );
            sink.write_block(&[0.0; 100]).unwrap();
        }
        assert!(matches!(
            sink.next_request(Duration::ZERO),
            Err(Error::Stream(_))
        ));
    }

    #[test]
    fn test_reopen_restarts_count() {
        let mut sink = MemorySink::new(4);
        sink.open(&settings(4)).unwrap();
        assert_eq!(sink.next_request(Duration::ZERO).unwrap(), BlockRequest::Frames(4));
        sink.write_block(&[0.0; 4]).unwrap();
        assert_eq!(sink.next_request(Duration::ZERO).unwrap(), BlockRequest::Finished);

        sink.open(&settings(4)).unwrap();
        assert_eq!(sink.next_request(Duration::ZERO).unwrap(), BlockRequest::Frames(4));
        assert_eq!(sink.capture().open_count(), 2);
    }

    #[test]
    fn test_realtime_sink_is_paced() {
        // 441 frames at 44.1 kHz: one block every 10 ms.
        let mut sink = MemorySink::realtime();
        sink.open(&settings(441)).unwrap();

        assert_eq!(
            sink.next_request(Duration::ZERO).unwrap(),
            BlockRequest::Frames(441)
        );
        // Next block is not due yet and the timeout is shorter than the wait.
        assert_eq!(
            sink.next_request(Duration::from_millis(1)).unwrap(),
            BlockRequest::Idle
        );

        let start = Instant::now();
        assert_eq!(
            sink.next_request(Duration::from_millis(50)).unwrap(),
            BlockRequest::Frames(441)
        );
        assert!(start.elapsed() <= Duration::from_millis(50));
    }
}
