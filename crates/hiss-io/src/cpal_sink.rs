//! Real-time output through [cpal](https://crates.io/crates/cpal).
//!
//! The device callback and the render thread trade a fixed set of block
//! buffers over two channels:
//!
//! ```text
//!            filled blocks (bounded)
//! render ───────────────────────────────► device callback
//! thread ◄─────────────────────────────── (copies to every channel)
//!            empty buffers (bounded)
//! ```
//!
//! An empty buffer coming back is the device's request for the next block,
//! so the render thread stays at most [`QUEUE_DEPTH`] blocks ahead of the
//! device and never allocates after `open`. The callback never blocks: when
//! no filled block is ready it outputs silence and counts an underrun.

use crate::sink::{AudioSink, BlockRequest};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use hiss_config::RenderSettings;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Number of block buffers shared between the render thread and the device.
pub const QUEUE_DEPTH: usize = 3;

fn device_name(device: &cpal::Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Names of the output devices on the default host.
pub fn output_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;
    Ok(devices.filter_map(|d| device_name(&d).ok()).collect())
}

/// Find an output device whose name contains `search` (case-insensitive),
/// or the default device when `search` is `None`.
fn find_output_device(host: &cpal::Host, search: Option<&str>) -> Result<cpal::Device> {
    match search {
        Some(search) => {
            let search_lower = search.to_lowercase();
            let devices = host
                .output_devices()
                .map_err(|e| Error::Stream(e.to_string()))?;

            for device in devices {
                if let Ok(name) = device_name(&device)
                    && name.to_lowercase().contains(search_lower.as_str())
                {
                    return Ok(device);
                }
            }
            Err(Error::DeviceNotFound(format!(
                "no output device matching '{}'",
                search
            )))
        }
        None => host.default_output_device().ok_or(Error::NoDevice),
    }
}

/// Check that the device can play `f32` at the requested rate and width.
fn check_format(device: &cpal::Device, settings: &RenderSettings) -> Result<()> {
    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Stream(e.to_string()))?
        .any(|range| {
            range.sample_format() == cpal::SampleFormat::F32
                && range.channels() == settings.channels
                && (range.min_sample_rate()..=range.max_sample_rate())
                    .contains(&settings.sample_rate)
        });
    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat(format!(
            "f32, {} channel(s) at {} Hz",
            settings.channels, settings.sample_rate
        )))
    }
}

/// State moved into the device callback.
struct CallbackState {
    filled: Receiver<Vec<f32>>,
    recycle: Sender<Vec<f32>>,
    current: Option<Vec<f32>>,
    position: usize,
    channels: usize,
    running: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
}

impl CallbackState {
    fn fill(&mut self, data: &mut [f32]) {
        if !self.running.load(Ordering::Relaxed) {
            data.fill(0.0);
            return;
        }

        let mut starved = false;
        for frame in data.chunks_mut(self.channels) {
            let sample = match self.next_sample() {
                Some(sample) => sample,
                None => {
                    starved = true;
                    0.0
                }
            };
            frame.fill(sample);
        }
        if starved {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn next_sample(&mut self) -> Option<f32> {
        loop {
            if let Some(block) = &self.current
                && self.position < block.len()
            {
                let sample = block[self.position];
                self.position += 1;
                return Some(sample);
            }

            if let Some(done) = self.current.take() {
                // The render thread owns the queue's capacity; a full or
                // closed recycle channel only happens during shutdown.
                let _ = self.recycle.try_send(done);
            }
            match self.filled.try_recv() {
                Ok(block) => {
                    self.current = Some(block);
                    self.position = 0;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }
}

/// Sink that plays blocks on an output device.
///
/// The mono block is copied to every device channel. Clearing the running
/// flag (on [`close`](AudioSink::close)) makes the callback output silence
/// from its next invocation on, before the stream itself is dropped.
pub struct CpalSink {
    device: Option<String>,
    stream: Option<cpal::Stream>,
    filled: Option<Sender<Vec<f32>>>,
    recycle: Option<Receiver<Vec<f32>>>,
    errors: Option<Receiver<String>>,
    pending: Option<Vec<f32>>,
    block_size: usize,
    running: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
}

impl CpalSink {
    /// Sink for the system default output device.
    pub fn new() -> Self {
        Self {
            device: None,
            stream: None,
            filled: None,
            recycle: None,
            errors: None,
            pending: None,
            block_size: 0,
            running: Arc::new(AtomicBool::new(false)),
            underruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sink for the first output device whose name contains `name`.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device: Some(name.into()),
            ..Self::new()
        }
    }

    /// Callbacks that ran out of rendered audio since the last `open`.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CpalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalSink")
            .field("device", &self.device)
            .field("open", &self.stream.is_some())
            .field("underruns", &self.underruns())
            .finish_non_exhaustive()
    }
}

impl AudioSink for CpalSink {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(&mut self, settings: &RenderSettings) -> Result<()> {
        let host = cpal::default_host();
        let search = self.device.as_deref().or(settings.device.as_deref());
        let device = find_output_device(&host, search)?;
        check_format(&device, settings)?;

        let (filled_tx, filled_rx) = bounded(QUEUE_DEPTH);
        let (recycle_tx, recycle_rx) = bounded(QUEUE_DEPTH);
        let (error_tx, error_rx) = bounded::<String>(4);
        for _ in 0..QUEUE_DEPTH {
            let _ = recycle_tx.try_send(Vec::with_capacity(settings.block_size));
        }

        self.underruns.store(0, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
        let mut callback = CallbackState {
            filled: filled_rx,
            recycle: recycle_tx,
            current: None,
            position: 0,
            channels: usize::from(settings.channels),
            running: Arc::clone(&self.running),
            underruns: Arc::clone(&self.underruns),
        };

        let stream_config = cpal::StreamConfig {
            channels: settings.channels,
            sample_rate: settings.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback.fill(data);
                },
                move |err| {
                    let _ = error_tx.try_send(err.to_string());
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            device = device_name(&device).unwrap_or_default(),
            channels = settings.channels,
            sample_rate = settings.sample_rate,
            "output stream started"
        );

        self.stream = Some(stream);
        self.filled = Some(filled_tx);
        self.recycle = Some(recycle_rx);
        self.errors = Some(error_rx);
        self.pending = None;
        self.block_size = settings.block_size;
        Ok(())
    }

    fn next_request(&mut self, timeout: Duration) -> Result<BlockRequest> {
        if let Some(errors) = &self.errors
            && let Ok(message) = errors.try_recv()
        {
            return Err(Error::Stream(message));
        }
        if self.pending.is_some() {
            return Ok(BlockRequest::Frames(self.block_size));
        }

        let recycle = self
            .recycle
            .as_ref()
            .ok_or_else(|| Error::Stream("output stream is not open".to_string()))?;
        match recycle.recv_timeout(timeout) {
            Ok(buffer) => {
                self.pending = Some(buffer);
                Ok(BlockRequest::Frames(self.block_size))
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(BlockRequest::Idle),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(Error::Stream("output stream closed".to_string()))
            }
        }
    }

    fn write_block(&mut self, block: &[f32]) -> Result<()> {
        let mut buffer = self
            .pending
            .take()
            .ok_or_else(|| Error::Stream("block written without a request".to_string()))?;
        buffer.clear();
        buffer.extend_from_slice(block);

        let filled = self
            .filled
            .as_ref()
            .ok_or_else(|| Error::Stream("output stream is not open".to_string()))?;
        match filled.try_send(buffer) {
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => {
                Err(Error::Stream("output stream closed".to_string()))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            drop(stream);
            let underruns = self.underruns();
            if underruns > 0 {
                tracing::warn!(underruns, "output stream ran out of audio");
            }
            tracing::info!("output stream stopped");
        }
        self.filled = None;
        self.recycle = None;
        self.errors = None;
        self.pending = None;
        Ok(())
    }
}
