//! WAV file output.

use crate::sink::{AudioSink, BlockRequest};
use crate::{Error, Result};
use hiss_config::RenderSettings;
use hound::{SampleFormat, WavReader, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Offline sink that writes a fixed number of frames to a WAV file.
///
/// The file is created on [`open`](AudioSink::open) with the configured
/// sample rate and channel count; each mono sample is written to every
/// channel. Output is 32-bit float unless [`with_bits`](Self::with_bits)
/// selects 16 or 24-bit integer samples.
pub struct WavSink {
    path: PathBuf,
    frames: u64,
    bits_per_sample: u16,
    block_size: usize,
    channels: u16,
    written: u64,
    writer: Option<WavWriter<BufWriter<File>>>,
}

impl WavSink {
    /// Sink that writes `frames` frames to `path`.
    pub fn new(path: impl Into<PathBuf>, frames: u64) -> Self {
        Self {
            path: path.into(),
            frames,
            bits_per_sample: 32,
            block_size: RenderSettings::default().block_size,
            channels: 1,
            written: 0,
            writer: None,
        }
    }

    /// Write integer samples with this many bits (16 or 24), or 32-bit float.
    pub fn with_bits(mut self, bits_per_sample: u16) -> Self {
        self.bits_per_sample = bits_per_sample;
        self
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written in the current run.
    pub fn frames_written(&self) -> u64 {
        self.written
    }
}

impl std::fmt::Debug for WavSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavSink")
            .field("path", &self.path)
            .field("frames", &self.frames)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl AudioSink for WavSink {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn open(&mut self, settings: &RenderSettings) -> Result<()> {
        let sample_format = match self.bits_per_sample {
            32 => SampleFormat::Float,
            16 | 24 => SampleFormat::Int,
            bits => {
                return Err(Error::UnsupportedFormat(format!(
                    "{bits}-bit WAV output"
                )));
            }
        };
        let spec = hound::WavSpec {
            channels: settings.channels,
            sample_rate: settings.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format,
        };

        self.writer = Some(WavWriter::create(&self.path, spec)?);
        self.block_size = settings.block_size;
        self.channels = settings.channels;
        self.written = 0;
        tracing::info!(
            path = %self.path.display(),
            frames = self.frames,
            sample_rate = settings.sample_rate,
            "wav output opened"
        );
        Ok(())
    }

    fn next_request(&mut self, _timeout: Duration) -> Result<BlockRequest> {
        if self.written >= self.frames {
            return Ok(BlockRequest::Finished);
        }
        let remaining = self.frames - self.written;
        Ok(BlockRequest::Frames(
            remaining.min(self.block_size as u64) as usize,
        ))
    }

    fn write_block(&mut self, block: &[f32]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Stream("wav output is not open".to_string()))?;

        if self.bits_per_sample == 32 {
            for &sample in block {
                for _ in 0..self.channels {
                    writer.write_sample(sample)?;
                }
            }
        } else {
            let max_val = (1i32 << (self.bits_per_sample - 1)) as f32;
            for &sample in block {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                for _ in 0..self.channels {
                    writer.write_sample(int_sample)?;
                }
            }
        }

        self.written += block.len() as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            tracing::info!(
                path = %self.path.display(),
                frames = self.written,
                "wav output finalized"
            );
        }
        Ok(())
    }
}

/// Read a WAV file as interleaved `f32` samples along with its spec.
///
/// Integer files are scaled to [-1.0, 1.0).
pub fn read_wav(path: impl AsRef<Path>) -> Result<(Vec<f32>, hound::WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(sink: &mut WavSink, settings: &RenderSettings, source: impl Fn(usize) -> f32) {
        sink.open(settings).unwrap();
        let mut index = 0;
        while let BlockRequest::Frames(n) = sink.next_request(Duration::ZERO).unwrap() {
            let block: Vec<f32> = (index..index + n).map(&source).collect();
            sink.write_block(&block).unwrap();
            index += n;
        }
        sink.close().unwrap();
    }

    #[test]
    fn test_float_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("float.wav");
        let settings = RenderSettings {
            sample_rate: 48_000,
            block_size: 300,
            ..RenderSettings::default()
        };

        let mut sink = WavSink::new(&path, 1000);
        run(&mut sink, &settings, |i| (i as f32 / 1000.0).sin());
        assert_eq!(sink.frames_written(), 1000);

        let (samples, spec) = read_wav(&path).unwrap();
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(samples.len(), 1000);
        for (i, s) in samples.iter().enumerate() {
            assert!((s - (i as f32 / 1000.0).sin()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_int16_stereo_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        let settings = RenderSettings {
            channels: 2,
            block_size: 64,
            ..RenderSettings::default()
        };

        let mut sink = WavSink::new(&path, 100).with_bits(16);
        run(&mut sink, &settings, |i| (i as f32 / 100.0) * 0.9);

        let (samples, spec) = read_wav(&path).unwrap();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples.len(), 200);
        for frame in samples.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!((samples[198] - 0.891).abs() < 0.001);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let dir = TempDir::new().unwrap();
        let mut sink = WavSink::new(dir.path().join("bad.wav"), 10).with_bits(12);
        assert!(matches!(
            sink.open(&RenderSettings::default()),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_write_before_open_fails() {
        let mut sink = WavSink::new("/nonexistent/never.wav", 10);
        assert!(matches!(sink.write_block(&[0.0]), Err(Error::Stream(_))));
    }
}
