//! The render thread.
//!
//! [`RenderBridge`] owns one background thread that feeds an [`AudioSink`]
//! from a [`ProcessingChain`]. The control thread never touches the chain
//! while it runs: parameters arrive through a [`SnapshotReader`] read once
//! per block, and replacement chains arrive over a channel drained at block
//! boundaries. Replaced chains are dropped on the render thread.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──start──► Running ──stop / sink finished──► Stopped ──start──► Running
//!                    │
//!                    └──sink error──► Failed ──start──► Running
//! ```
//!
//! When the thread exits, the chain and sink come back to the bridge, so a
//! stopped bridge can be started again with filter history intact.

use crate::sink::{AudioSink, BlockRequest};
use crate::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use hiss_config::{ProcessingChain, RenderSettings, SnapshotReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Render thread state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BridgeState {
    /// Never started.
    Idle = 0,
    /// The render thread is running.
    Running = 1,
    /// The render thread exited after a stop request or a finished sink.
    Stopped = 2,
    /// The render thread exited after a sink error.
    Failed = 3,
}

impl BridgeState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BridgeState::Running,
            2 => BridgeState::Stopped,
            3 => BridgeState::Failed,
            _ => BridgeState::Idle,
        }
    }
}

/// State shared between the bridge and its thread.
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    cancel: AtomicBool,
    blocks: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: BridgeState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// A replacement chain and the channel that confirms it was swapped in.
type ChainSwap = (ProcessingChain, Sender<()>);

/// What the render thread owns while it runs.
struct RenderParts {
    chain: ProcessingChain,
    sink: Box<dyn AudioSink>,
}

struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<RenderParts>,
}

/// Real-time entry point: one render thread pulling blocks for one sink.
///
/// # Example
///
/// ```rust
/// use hiss_config::{ParameterStore, ProcessingChain, ProcessorRegistry, RenderSettings};
/// use hiss_io::{BridgeState, MemorySink, RenderBridge};
///
/// let registry = ProcessorRegistry::new();
/// let store = ParameterStore::from_registry(&registry).unwrap();
/// let chain = ProcessingChain::default_chain(&registry).unwrap();
///
/// let sink = MemorySink::new(10_000);
/// let capture = sink.capture();
/// let settings = RenderSettings::default();
/// let mut bridge = RenderBridge::new(chain, Box::new(sink), store.reader(), settings);
///
/// bridge.start().unwrap();
/// assert_eq!(bridge.wait(None).unwrap(), BridgeState::Stopped);
/// assert_eq!(capture.samples().len(), 10_000);
/// ```
pub struct RenderBridge {
    settings: RenderSettings,
    reader: SnapshotReader,
    shared: Arc<Shared>,
    chain_tx: Sender<ChainSwap>,
    chain_rx: Receiver<ChainSwap>,
    parts: Option<RenderParts>,
    worker: Option<Worker>,
}

impl RenderBridge {
    /// Create an idle bridge. Nothing runs until [`start`](Self::start).
    pub fn new(
        chain: ProcessingChain,
        sink: Box<dyn AudioSink>,
        reader: SnapshotReader,
        settings: RenderSettings,
    ) -> Self {
        let (chain_tx, chain_rx) = unbounded();
        Self {
            settings,
            reader,
            shared: Arc::new(Shared {
                state: AtomicU8::new(BridgeState::Idle as u8),
                cancel: AtomicBool::new(false),
                blocks: AtomicU64::new(0),
            }),
            chain_tx,
            chain_rx,
            parts: Some(RenderParts { chain, sink }),
            worker: None,
        }
    }

    /// Start the render thread. Does nothing if it is already running.
    ///
    /// A thread that ended on its own (finished or failed sink) is joined
    /// first and the sink is reopened. If a previous thread is still
    /// shutting down, this waits up to the stop timeout for it.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            let stopping = self.shared.cancel.load(Ordering::Acquire);
            if self.is_running() && !stopping {
                return Ok(());
            }
            self.reclaim(Some(self.settings.stop_timeout()))?;
        }

        let Some(parts) = self.parts.take() else {
            return Err(Error::Stream(
                "render thread resources are unavailable".to_string(),
            ));
        };

        self.shared.cancel.store(false, Ordering::Release);
        self.shared.set_state(BridgeState::Running);

        let (done_tx, done_rx) = bounded(1);
        let context = RenderContext {
            settings: self.settings.clone(),
            reader: self.reader.clone(),
            shared: Arc::clone(&self.shared),
            chain_rx: self.chain_rx.clone(),
        };
        let spawned = std::thread::Builder::new()
            .name("hiss-render".to_string())
            .spawn(move || {
                let parts = context.run(parts);
                let _ = done_tx.send(parts);
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    handle,
                    done: done_rx,
                });
                Ok(())
            }
            Err(err) => {
                self.shared.set_state(BridgeState::Failed);
                Err(Error::Io(err))
            }
        }
    }

    /// Signal cancellation and wait for the render thread to exit.
    ///
    /// Waits at most the configured stop timeout. Does nothing if no thread
    /// is running.
    pub fn stop(&mut self) -> Result<()> {
        if self.worker.is_none() {
            return Ok(());
        }
        self.shared.cancel.store(true, Ordering::Release);
        self.reclaim(Some(self.settings.stop_timeout()))
    }

    /// Wait for the render thread to exit on its own, e.g. when a finite
    /// sink finishes. `None` waits indefinitely.
    ///
    /// Returns the state the thread left the bridge in.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<BridgeState> {
        if self.worker.is_some() {
            self.reclaim(timeout)?;
        }
        Ok(self.state())
    }

    /// Swap in a new chain at the next block boundary.
    ///
    /// The old chain, with all its filter history, is dropped by the render
    /// thread. On an idle bridge the swap happens when it starts. The
    /// returned receiver gets a message once the render thread has the new
    /// chain.
    pub fn replace_chain(&self, chain: ProcessingChain) -> Receiver<()> {
        let (swapped_tx, swapped_rx) = bounded(1);
        // The bridge holds the receiver, so the channel is never disconnected.
        let _ = self.chain_tx.send((chain, swapped_tx));
        swapped_rx
    }

    /// Current state.
    pub fn state(&self) -> BridgeState {
        BridgeState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// True while the render thread is running.
    pub fn is_running(&self) -> bool {
        self.state() == BridgeState::Running
    }

    /// Total blocks handed to the sink since the bridge was created.
    pub fn blocks_rendered(&self) -> u64 {
        self.shared.blocks.load(Ordering::Relaxed)
    }

    /// Render settings used for every run.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn reclaim(&mut self, timeout: Option<Duration>) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let received = match timeout {
            Some(timeout) => worker.done.recv_timeout(timeout),
            None => worker
                .done
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(parts) => {
                if worker.handle.join().is_err() {
                    tracing::error!("render thread panicked during shutdown");
                }
                self.parts = Some(parts);
                self.shared.cancel.store(false, Ordering::Release);
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                let timeout = timeout.unwrap_or_default();
                tracing::warn!(?timeout, "render thread did not stop in time");
                self.worker = Some(worker);
                Err(Error::StopTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The thread exited without handing back its parts.
                let _ = worker.handle.join();
                self.shared.set_state(BridgeState::Failed);
                tracing::error!("render thread exited abnormally");
                Err(Error::Stream("render thread panicked".to_string()))
            }
        }
    }
}

impl Drop for RenderBridge {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(%err, "render thread left running on drop");
        }
    }
}

impl std::fmt::Debug for RenderBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBridge")
            .field("state", &self.state())
            .field("blocks_rendered", &self.blocks_rendered())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Everything the render thread needs besides the parts it owns.
struct RenderContext {
    settings: RenderSettings,
    reader: SnapshotReader,
    shared: Arc<Shared>,
    chain_rx: Receiver<ChainSwap>,
}

impl RenderContext {
    fn run(self, mut parts: RenderParts) -> RenderParts {
        let sink_name = parts.sink.name();
        if let Err(err) = parts.sink.open(&self.settings) {
            tracing::error!(sink = sink_name, %err, "failed to open audio sink");
            self.shared.set_state(BridgeState::Failed);
            return parts;
        }
        tracing::info!(
            sink = sink_name,
            block_size = self.settings.block_size,
            sample_rate = self.settings.sample_rate,
            "render thread started"
        );

        let outcome = self.render_loop(&mut parts);

        let outcome = match parts.sink.close() {
            Ok(()) => outcome,
            Err(err) => {
                tracing::error!(sink = sink_name, %err, "failed to close audio sink");
                BridgeState::Failed
            }
        };
        tracing::info!(
            sink = sink_name,
            state = ?outcome,
            blocks = self.shared.blocks.load(Ordering::Relaxed),
            "render thread stopped"
        );
        self.shared.set_state(outcome);
        parts
    }

    fn render_loop(&self, parts: &mut RenderParts) -> BridgeState {
        let poll = self
            .settings
            .block_duration()
            .min(self.settings.stop_timeout());
        let mut buffer = vec![0.0; self.settings.block_size];
        let mut silenced = false;

        loop {
            if self.shared.cancel.load(Ordering::Acquire) {
                return BridgeState::Stopped;
            }
            while let Ok((chain, swapped)) = self.chain_rx.try_recv() {
                tracing::info!(stages = ?chain.stage_ids(), "processing chain replaced");
                parts.chain = chain;
                let _ = swapped.try_send(());
            }

            let frames = match parts.sink.next_request(poll) {
                Ok(BlockRequest::Frames(frames)) => frames,
                Ok(BlockRequest::Idle) => continue,
                Ok(BlockRequest::Finished) => {
                    tracing::debug!("audio sink finished");
                    return BridgeState::Stopped;
                }
                Err(err) => {
                    tracing::error!(%err, "audio sink failed");
                    return BridgeState::Failed;
                }
            };

            if frames > buffer.len() {
                buffer.resize(frames, 0.0);
            }
            let block = &mut buffer[..frames];
            let snapshot = self.reader.load();
            match parts.chain.render_into(block, &snapshot) {
                Ok(()) => silenced = false,
                Err(err) => {
                    if !silenced {
                        tracing::warn!(%err, "parameters rejected by chain, rendering silence");
                        silenced = true;
                    }
                    block.fill(0.0);
                }
            }

            if let Err(err) = parts.sink.write_block(block) {
                tracing::error!(%err, "audio sink rejected block");
                return BridgeState::Failed;
            }
            self.shared.blocks.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use hiss_config::{ParameterStore, ProcessorRegistry};

    fn bridge(sink: MemorySink, block_size: usize) -> RenderBridge {
        let registry = ProcessorRegistry::new();
        let store = ParameterStore::from_registry(&registry).unwrap();
        let chain = ProcessingChain::default_chain(&registry).unwrap();
        let settings = RenderSettings {
            block_size,
            stop_timeout_ms: 500,
            ..RenderSettings::default()
        };
        RenderBridge::new(chain, Box::new(sink), store.reader(), settings)
    }

    #[test]
    fn test_state_roundtrip() {
        for state in [
            BridgeState::Idle,
            BridgeState::Running,
            BridgeState::Stopped,
            BridgeState::Failed,
        ] {
            assert_eq!(BridgeState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_idle_until_started() {
        let mut bridge = bridge(MemorySink::new(100), 64);
        assert_eq!(bridge.state(), BridgeState::Idle);
        assert!(!bridge.is_running());
        bridge.stop().unwrap();
        assert_eq!(bridge.wait(None).unwrap(), BridgeState::Idle);
    }

    #[test]
    fn test_finite_sink_stops_thread() {
        let sink = MemorySink::new(1000);
        let capture = sink.capture();
        let mut bridge = bridge(sink, 256);

        bridge.start().unwrap();
        assert_eq!(bridge.wait(None).unwrap(), BridgeState::Stopped);
        assert_eq!(bridge.blocks_rendered(), 4);
        assert_eq!(capture.samples().len(), 1000);
        assert_eq!(capture.close_count(), 1);
    }

    #[test]
    fn test_restart_reopens_sink() {
        let sink = MemorySink::new(128);
        let capture = sink.capture();
        let mut bridge = bridge(sink, 128);

        bridge.start().unwrap();
        bridge.wait(None).unwrap();
        bridge.start().unwrap();
        bridge.wait(None).unwrap();

        assert_eq!(capture.open_count(), 2);
        assert_eq!(capture.blocks(), 2);
        let samples = capture.samples();
        // Same source, continued: the second run is not a repeat of the first.
        assert_ne!(&samples[..128], &samples[128..]);
    }
}
