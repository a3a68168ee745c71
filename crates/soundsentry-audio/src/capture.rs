use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::device::DeviceManager;
use crate::ring_buffer::{SampleConsumer, SampleRing};
use crate::source::SampleSource;
use soundsentry_foundation::AudioError;

/// Ring capacity in chunks. Small on purpose: the monitor polls far slower
/// than the device produces, and a deep ring would make readings stale.
const RING_CHUNKS: usize = 4;

/// How long one read waits for the device before it counts as a failure.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub buffers_captured: AtomicU64,
    pub buffers_dropped: AtomicU64,
    pub stream_errors: AtomicU64,
}

/// An open input stream delivering fixed-size mono i16 buffers.
///
/// The cpal callback converts whatever format the device negotiates down to
/// mono i16 and feeds the sample ring; `read_chunk` assembles one chunk on
/// the caller's side. Dropping the stream stops capture and releases the
/// device.
///
/// Holds a `cpal::Stream` and is therefore not `Send`; open it on the thread
/// that will read from it.
pub struct CaptureStream {
    _stream: Stream,
    consumer: SampleConsumer,
    chunk_size: usize,
    sample_rate_hz: u32,
    read_timeout: Duration,
    scratch: Vec<i16>,
    stats: Arc<CaptureStats>,
}

impl CaptureStream {
    /// Open the input device and start capturing.
    ///
    /// Tries to run the device at `sample_rate_hz`; when the hardware cannot,
    /// falls back to its default configuration and captures at the native
    /// rate (the level estimate does not depend on the exact rate).
    pub fn open(
        sample_rate_hz: u32,
        chunk_size: usize,
        device_index: Option<usize>,
    ) -> Result<Self, AudioError> {
        let manager = DeviceManager::new();
        let device = manager.open_input(device_index)?;
        let (config, sample_format) = negotiate_config(&device, sample_rate_hz)?;
        tracing::info!(
            "Input config: {} Hz, {} ch, {:?}",
            config.sample_rate,
            config.channels,
            sample_format
        );

        let ring = SampleRing::new(chunk_size * RING_CHUNKS);
        let (producer, consumer) = ring.split();
        let stats = Arc::new(CaptureStats::default());

        let stream = build_stream(&device, &config, sample_format, producer, Arc::clone(&stats))?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            consumer,
            chunk_size,
            sample_rate_hz: config.sample_rate,
            read_timeout: READ_TIMEOUT,
            scratch: vec![0i16; chunk_size],
            stats,
        })
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }
}

impl SampleSource for CaptureStream {
    /// Block until one full chunk is available or the read timeout passes.
    /// A timeout with partial data is a short read; with no data at all, a
    /// no-data timeout. Both are recoverable read failures for the caller.
    fn read_chunk(&mut self) -> Result<Vec<i16>, AudioError> {
        // Discard backlog so the chunk reflects current audio, not ring history.
        while self.consumer.slots() >= 2 * self.chunk_size {
            let _ = self.consumer.read(&mut self.scratch);
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut buffer = vec![0i16; self.chunk_size];
        let mut filled = 0usize;
        loop {
            filled += self.consumer.read(&mut buffer[filled..]);
            if filled == self.chunk_size {
                return Ok(buffer);
            }
            if Instant::now() >= deadline {
                if filled > 0 {
                    return Err(AudioError::ShortRead {
                        got: filled,
                        want: self.chunk_size,
                    });
                }
                return Err(AudioError::NoDataTimeout {
                    duration: self.read_timeout,
                });
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        tracing::info!("Input stream closed");
    }
}

fn negotiate_config(
    device: &cpal::Device,
    requested_rate: u32,
) -> Result<(StreamConfig, SampleFormat), AudioError> {
    // Prefer a config that can run at the requested rate, fewest channels first
    if let Ok(ranges) = device.supported_input_configs() {
        let mut best: Option<cpal::SupportedStreamConfigRange> = None;
        for range in ranges {
            if range.min_sample_rate() <= requested_rate
                && range.max_sample_rate() >= requested_rate
            {
                let better = match &best {
                    Some(current) => range.channels() < current.channels(),
                    None => true,
                };
                if better {
                    best = Some(range);
                }
            }
        }
        if let Some(range) = best {
            let sample_format = range.sample_format();
            return Ok((
                StreamConfig {
                    channels: range.channels(),
                    sample_rate: requested_rate,
                    buffer_size: cpal::BufferSize::Default,
                },
                sample_format,
            ));
        }
    }

    if let Ok(default_config) = device.default_input_config() {
        return Ok((
            StreamConfig {
                channels: default_config.channels(),
                sample_rate: default_config.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            default_config.sample_format(),
        ));
    }

    Err(AudioError::FormatNotSupported {
        format: "No supported input configuration".to_string(),
    })
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    mut producer: crate::ring_buffer::SampleProducer,
    stats: Arc<CaptureStats>,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;
    let err_stats = Arc::clone(&stats);
    let err_fn = move |err: cpal::StreamError| {
        tracing::error!("Audio stream error: {}", err);
        err_stats.stream_errors.fetch_add(1, Ordering::Relaxed);
    };

    // Downmix interleaved frames to mono and feed the ring. Runs on the
    // audio callback thread; thread-local buffers avoid per-callback allocation.
    thread_local! {
        static MONO_BUFFER: std::cell::RefCell<Vec<i16>> = const { std::cell::RefCell::new(Vec::new()) };
        static CONVERT_BUFFER: std::cell::RefCell<Vec<i16>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    let mut handle_i16 = move |data: &[i16]| {
        let write = |producer: &mut crate::ring_buffer::SampleProducer, mono: &[i16]| {
            if producer.write(mono).is_ok() {
                stats.buffers_captured.fetch_add(1, Ordering::Relaxed);
            } else {
                stats.buffers_dropped.fetch_add(1, Ordering::Relaxed);
            }
        };
        if channels <= 1 {
            write(&mut producer, data);
            return;
        }
        MONO_BUFFER.with(|buf| {
            let mut mono = buf.borrow_mut();
            mono.clear();
            mono.reserve(data.len() / channels);
            for frame in data.chunks_exact(channels) {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                mono.push((sum / channels as i32) as i16);
            }
            write(&mut producer, &mono);
        });
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &_| {
                handle_i16(data);
            },
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &_| {
                CONVERT_BUFFER.with(|buf| {
                    let mut converted = buf.borrow_mut();
                    converted.clear();
                    converted.reserve(data.len());
                    // Clamp [-1.0, 1.0] and scale to i16
                    for &s in data {
                        let clamped = s.clamp(-1.0, 1.0);
                        converted.push((clamped * 32767.0).round() as i16);
                    }
                    handle_i16(&converted);
                });
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &_| {
                CONVERT_BUFFER.with(|buf| {
                    let mut converted = buf.borrow_mut();
                    converted.clear();
                    converted.reserve(data.len());
                    // Convert unsigned [0,65535] to signed [-32768,32767]
                    for &s in data {
                        converted.push((s as i32 - 32768) as i16);
                    }
                    handle_i16(&converted);
                });
            },
            err_fn,
            None,
        )?,
        other => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{:?}", other),
            });
        }
    };

    Ok(stream)
}
