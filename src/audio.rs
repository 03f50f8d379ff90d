use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, InputCallbackInfo, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
    StreamError,
};
use crossbeam_channel::{Receiver, Sender, bounded};
use realfft::RealFftPlanner;
use realfft::num_complex::Complex32;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::{BIN_COUNT, FFT_SIZE, SMOOTHING_TIME_CONSTANT};
use crate::types::{Bins, not_ready};

/// One live audio source plus its analysis thread. Dropping the graph tears
/// everything down: the cpal stream stops, the feed thread sees the stop flag,
/// and the analyzer exits once its frame channel closes.
pub struct AudioGraph {
    _stream: Option<Stream>,
    stop: Arc<AtomicBool>,
    rx_spec: Receiver<Box<Bins>>,
    rx_ended: Option<Receiver<()>>,
    latest: Box<Bins>,
}

impl AudioGraph {
    /// Capture from the default input device.
    pub fn microphone() -> Result<AudioGraph> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no default input device")?;

        let input_cfg = device
            .default_input_config()
            .context("no default input config")?;
        let cfg = input_cfg.config();
        let channels = cfg.channels as usize;

        let (tx_frames, rx_frames) = bounded::<Vec<f32>>(16);
        let (tx_spec, rx_spec) = bounded::<Box<Bins>>(8);
        start_spectrum_analyzer(rx_frames, tx_spec);

        let stream =
            create_input_stream(&device, input_cfg.sample_format(), &cfg, channels, tx_frames)?;

        Ok(AudioGraph {
            _stream: Some(stream),
            stop: Arc::new(AtomicBool::new(false)),
            rx_spec,
            rx_ended: None,
            latest: not_ready(),
        })
    }

    /// Analyze a bundled WAV track, paced in real time by a feed thread.
    pub fn demo_track(path: &Path) -> Result<AudioGraph> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();
        let samples = read_samples(&mut reader)?;
        let frames = mix_to_mono(&samples, spec.channels as usize);

        let (tx_frames, rx_frames) = bounded::<Vec<f32>>(16);
        let (tx_spec, rx_spec) = bounded::<Box<Bins>>(8);
        let (tx_ended, rx_ended) = bounded::<()>(1);
        start_spectrum_analyzer(rx_frames, tx_spec);

        let stop = Arc::new(AtomicBool::new(false));
        spawn_demo_feed(frames, spec.sample_rate, tx_frames, tx_ended, stop.clone());

        Ok(AudioGraph {
            _stream: None,
            stop,
            rx_spec,
            rx_ended: Some(rx_ended),
            latest: not_ready(),
        })
    }

    /// Non-blocking read of the most recent spectrum. Until the analyzer has
    /// produced a frame the buffer carries the not-ready sentinel at bin 0.
    pub fn poll(&mut self, out: &mut Bins) {
        while let Ok(spec) = self.rx_spec.try_recv() {
            self.latest = spec;
        }
        out.copy_from_slice(&self.latest[..]);
    }

    /// True once a demo track has played to the end.
    pub fn finished(&self) -> bool {
        match &self.rx_ended {
            Some(rx) => rx.try_recv().is_ok(),
            None => false,
        }
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// FFT analysis thread: consumes mono frames, publishes decibel spectra.
/// Matches analyser-node semantics: Hann window, 50% hop, magnitudes smoothed
/// over time before conversion to dB.
fn start_spectrum_analyzer(rx_frames: Receiver<Vec<f32>>, tx_spec: Sender<Box<Bins>>) {
    std::thread::spawn(move || {
        let hop = FFT_SIZE / 2;

        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(FFT_SIZE);

        let mut input: Vec<f32> = r2c.make_input_vec();
        let mut spectrum: Vec<Complex32> = r2c.make_output_vec();
        let mut scratch = r2c.make_scratch_vec();

        let window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| {
                let n = i as f32;
                0.5 - 0.5 * ((2.0 * std::f32::consts::PI * n) / FFT_SIZE as f32).cos()
            })
            .collect();

        // rolling buffer of mono frames
        let mut ring: Vec<f32> = Vec::with_capacity(FFT_SIZE * 2);
        let mut smooth_mag = vec![0.0f32; BIN_COUNT];
        let norm = 2.0 / FFT_SIZE as f32;

        while let Ok(chunk) = rx_frames.recv() {
            ring.extend_from_slice(&chunk);

            while ring.len() >= FFT_SIZE {
                for i in 0..FFT_SIZE {
                    input[i] = ring[i] * window[i];
                }

                r2c.process_with_scratch(&mut input, &mut spectrum, &mut scratch)
                    .expect("FFT failed");

                let mut bins = Box::new([0.0f32; BIN_COUNT]);
                for i in 0..BIN_COUNT {
                    let c = spectrum[i];
                    let mag = (c.re * c.re + c.im * c.im).sqrt() * norm;
                    smooth_mag[i] = SMOOTHING_TIME_CONSTANT * smooth_mag[i]
                        + (1.0 - SMOOTHING_TIME_CONSTANT) * mag;
                    bins[i] = 20.0 * smooth_mag[i].max(1e-7).log10();
                }

                let _ = tx_spec.try_send(bins);

                // advance by hop (50% overlap)
                ring.drain(0..hop);
            }
        }
    });
}

fn build_input_stream<T>(
    device: &Device,
    cfg: &StreamConfig,
    channels: usize,
    tx_frames: Sender<Vec<f32>>,
) -> Result<Stream>
where
    T: Sample + Send + 'static + SizedSample + std::fmt::Debug,
    f32: FromSample<<T as Sample>::Float>,
{
    let err_callback = |err: StreamError| eprintln!("an error occurred on stream: {}", err);

    let input_callback = move |data: &[T], _info: &InputCallbackInfo| {
        let mut mono_chunk = Vec::with_capacity(data.len() / channels);

        for frame in data.chunks(channels) {
            let left = frame
                .first()
                .map(|s| f32::from_sample(s.to_float_sample()))
                .unwrap_or(0.0f32);

            let right = if channels > 1 {
                frame
                    .get(1)
                    .map(|s| f32::from_sample((*s).to_float_sample()))
                    .unwrap_or(0.0f32)
            } else {
                left
            };

            mono_chunk.push(0.5f32 * (left + right));
        }

        if !mono_chunk.is_empty() {
            let _ = tx_frames.try_send(mono_chunk);
        }
    };

    let latency = Some(Duration::from_millis(20));
    let stream = device.build_input_stream(cfg, input_callback, err_callback, latency)?;
    stream.play()?;
    Ok(stream)
}

fn create_input_stream(
    device: &Device,
    sample_format: SampleFormat,
    cfg: &StreamConfig,
    channels: usize,
    tx_frames: Sender<Vec<f32>>,
) -> Result<Stream> {
    match sample_format {
        SampleFormat::F32 => build_input_stream::<f32>(device, cfg, channels, tx_frames),
        SampleFormat::I16 => build_input_stream::<i16>(device, cfg, channels, tx_frames),
        SampleFormat::U16 => build_input_stream::<u16>(device, cfg, channels, tx_frames),
        _ => anyhow::bail!("unsupported sample format: {:?}", sample_format),
    }
}

fn read_samples(reader: &mut hound::WavReader<impl std::io::Read>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()?
        }
    };
    Ok(samples)
}

fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| 0.5 * (frame[0] + frame.get(1).copied().unwrap_or(frame[0])))
        .collect()
}

/// Pushes the decoded track through the analyzer at playback speed, then
/// signals completion so the driver can fall back to the microphone.
fn spawn_demo_feed(
    frames: Vec<f32>,
    sample_rate: u32,
    tx_frames: Sender<Vec<f32>>,
    tx_ended: Sender<()>,
    stop: Arc<AtomicBool>,
) {
    std::thread::spawn(move || {
        let chunk_len = FFT_SIZE;
        let chunk_period = Duration::from_secs_f64(chunk_len as f64 / sample_rate as f64);

        for chunk in frames.chunks(chunk_len) {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            let _ = tx_frames.try_send(chunk.to_vec());
            std::thread::sleep(chunk_period);
        }
        let _ = tx_ended.try_send(());
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_mixdown_averages_stereo_pairs() {
        let interleaved = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(mix_to_mono(&interleaved, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_input_passes_through() {
        let samples = [0.25, -0.25];
        assert_eq!(mix_to_mono(&samples, 1), samples.to_vec());
    }

    #[test]
    fn extra_channels_beyond_two_are_ignored() {
        let interleaved = [1.0, 0.0, 9.0, 9.0];
        assert_eq!(mix_to_mono(&interleaved, 4), vec![0.5]);
    }
}
