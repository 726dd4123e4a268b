//! Capture device backed by cpal
//!
//! cpal::Stream is not Send, so each capture owns a dedicated thread that
//! builds the input stream, keeps it alive while the capture is open, and
//! drops it once finalization is requested. Pausing leaves the stream
//! running and simply stops appending samples.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Local;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use rodio::{Decoder, OutputStream, Sink};
use rubato::{FftFixedIn, Resampler};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::encoder::{encode_flac, SPEECH_SAMPLE_RATE};
use crate::application::ports::{CaptureDevice, CaptureHandle, DeviceError, Permission};
use crate::domain::catalog::LocationRef;

/// How often the capture thread checks whether it should shut down
const POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// State shared between the device and its capture thread
struct CaptureShared {
    samples: Mutex<Vec<i16>>,
    /// False while paused
    capturing: AtomicBool,
    /// False once the capture should end
    open: AtomicBool,
}

impl CaptureShared {
    fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            capturing: AtomicBool::new(true),
            open: AtomicBool::new(true),
        }
    }

    fn push(&self, mono: &[i16]) {
        if self.capturing.load(Ordering::SeqCst) {
            lock(&self.samples).extend_from_slice(mono);
        }
    }
}

/// The capture currently holding the channel
struct ActiveCapture {
    handle: CaptureHandle,
    shared: Arc<CaptureShared>,
    sample_rate: u32,
    thread: JoinHandle<()>,
}

/// Capture device over the default cpal input
pub struct CpalCaptureDevice {
    recordings_dir: PathBuf,
    next_id: AtomicU64,
    active: Mutex<Option<ActiveCapture>>,
}

impl CpalCaptureDevice {
    /// Create a device that writes finalized recordings into `recordings_dir`
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
        }
    }

    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    fn input_device() -> Result<cpal::Device, DeviceError> {
        cpal::default_host()
            .default_input_device()
            .ok_or(DeviceError::NoDevice)
    }

    /// Pick an i16 or f32 input config, preferring fewer channels and one
    /// that can run at the speech rate directly
    fn input_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), DeviceError> {
        let supported = device
            .supported_input_configs()
            .map_err(|e| DeviceError::StartFailed(format!("Failed to get configs: {}", e)))?;

        let mut best: Option<cpal::SupportedStreamConfigRange> = None;
        for range in supported {
            if !matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32) {
                continue;
            }
            let better = match &best {
                None => true,
                Some(current) => {
                    range.channels() < current.channels()
                        || (supports_speech_rate(&range) && !supports_speech_rate(current))
                }
            };
            if better {
                best = Some(range);
            }
        }

        let range = best.ok_or_else(|| DeviceError::StartFailed("No suitable config found".into()))?;
        let sample_rate = if supports_speech_rate(&range) {
            SampleRate(SPEECH_SAMPLE_RATE)
        } else {
            range.min_sample_rate()
        };

        let config = StreamConfig {
            channels: range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, range.sample_format()))
    }

    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        format: SampleFormat,
        shared: Arc<CaptureShared>,
    ) -> Result<cpal::Stream, DeviceError> {
        let channels = config.channels;
        let on_error = |err: cpal::StreamError| warn!(error = %err, "audio input stream error");

        let stream = match format {
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    shared.push(&downmix(data, channels));
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let pcm: Vec<i16> = data.iter().map(|&s| (s * 32767.0) as i16).collect();
                    shared.push(&downmix(&pcm, channels));
                },
                on_error,
                None,
            ),
            other => {
                return Err(DeviceError::StartFailed(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream.map_err(|e| DeviceError::StartFailed(e.to_string()))
    }

    /// Body of the capture thread. Reports the stream's sample rate once the
    /// stream is playing, then holds it until the capture is closed.
    fn run_capture(shared: Arc<CaptureShared>, ready: oneshot::Sender<Result<u32, DeviceError>>) {
        let opened = Self::input_device().and_then(|device| {
            let (config, format) = Self::input_config(&device)?;
            let stream = Self::build_stream(&device, &config, format, Arc::clone(&shared))?;
            stream
                .play()
                .map_err(|e| DeviceError::StartFailed(e.to_string()))?;
            Ok((stream, config.sample_rate.0))
        });

        let stream = match opened {
            Ok((stream, rate)) => {
                if ready.send(Ok(rate)).is_err() {
                    return;
                }
                stream
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        while shared.open.load(Ordering::SeqCst) {
            std::thread::sleep(POLL_INTERVAL);
        }
        drop(stream);
    }

    fn with_active<T>(
        &self,
        handle: CaptureHandle,
        f: impl FnOnce(&ActiveCapture) -> T,
    ) -> Result<T, DeviceError> {
        match lock(&self.active).as_ref() {
            Some(active) if active.handle == handle => Ok(f(active)),
            _ => Err(DeviceError::InvalidHandle(handle.id())),
        }
    }

    fn asset_path(&self, handle: CaptureHandle) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        self.recordings_dir
            .join(format!("recording-{}-{}.flac", stamp, handle.id()))
    }
}

#[async_trait]
impl CaptureDevice for CpalCaptureDevice {
    async fn request_permission(&self) -> Result<Permission, DeviceError> {
        let has_input = tokio::task::spawn_blocking(|| Self::input_device().is_ok())
            .await
            .map_err(|e| DeviceError::StartFailed(format!("Task join error: {}", e)))?;

        Ok(if has_input {
            Permission::Granted
        } else {
            Permission::Denied
        })
    }

    async fn start(&self) -> Result<CaptureHandle, DeviceError> {
        if lock(&self.active).is_some() {
            return Err(DeviceError::ChannelBusy);
        }

        let shared = Arc::new(CaptureShared::new());
        let (ready_tx, ready_rx) = oneshot::channel();
        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("kronikle-capture".to_string())
            .spawn(move || Self::run_capture(thread_shared, ready_tx))
            .map_err(|e| DeviceError::StartFailed(e.to_string()))?;

        let sample_rate = ready_rx
            .await
            .map_err(|_| DeviceError::StartFailed("capture thread exited".to_string()))??;

        let handle = CaptureHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut active = lock(&self.active);
        if active.is_some() {
            shared.open.store(false, Ordering::SeqCst);
            return Err(DeviceError::ChannelBusy);
        }
        *active = Some(ActiveCapture {
            handle,
            shared,
            sample_rate,
            thread,
        });

        info!(handle = handle.id(), sample_rate, "capture started");
        Ok(handle)
    }

    async fn pause(&self, handle: CaptureHandle) -> Result<(), DeviceError> {
        self.with_active(handle, |active| {
            active.shared.capturing.store(false, Ordering::SeqCst)
        })?;
        debug!(handle = handle.id(), "capture paused");
        Ok(())
    }

    async fn resume(&self, handle: CaptureHandle) -> Result<(), DeviceError> {
        self.with_active(handle, |active| {
            active.shared.capturing.store(true, Ordering::SeqCst)
        })?;
        debug!(handle = handle.id(), "capture resumed");
        Ok(())
    }

    async fn stop_and_finalize(&self, handle: CaptureHandle) -> Result<LocationRef, DeviceError> {
        let active = {
            let mut slot = lock(&self.active);
            match slot.take() {
                Some(active) if active.handle == handle => active,
                other => {
                    *slot = other;
                    return Err(DeviceError::InvalidHandle(handle.id()));
                }
            }
        };

        // The channel is free from here on, whatever happens to the audio.
        active.shared.open.store(false, Ordering::SeqCst);
        let ActiveCapture {
            shared,
            sample_rate,
            thread,
            ..
        } = active;

        let flac = tokio::task::spawn_blocking(move || {
            if thread.join().is_err() {
                warn!("capture thread panicked");
            }
            let samples = std::mem::take(&mut *lock(&shared.samples));
            let speech = resample_to_speech_rate(&samples, sample_rate)?;
            encode_flac(&speech, SPEECH_SAMPLE_RATE)
                .map_err(|e| DeviceError::FinalizeFailed(e.to_string()))
        })
        .await
        .map_err(|e| DeviceError::FinalizeFailed(format!("Encode task error: {}", e)))??;

        let path = self.asset_path(handle);
        tokio::fs::create_dir_all(&self.recordings_dir)
            .await
            .map_err(|e| DeviceError::FinalizeFailed(e.to_string()))?;
        tokio::fs::write(&path, &flac)
            .await
            .map_err(|e| DeviceError::FinalizeFailed(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), bytes = flac.len(), "recording finalized");
        Ok(LocationRef::new(path.to_string_lossy()))
    }

    async fn play(&self, location: &LocationRef) -> Result<(), DeviceError> {
        let path = PathBuf::from(location.as_str());
        tokio::task::spawn_blocking(move || play_file(&path))
            .await
            .map_err(|e| DeviceError::PlaybackFailed(format!("Task join error: {}", e)))?
    }
}

/// Decode a recording and block until it has played out
fn play_file(path: &Path) -> Result<(), DeviceError> {
    let file = File::open(path)
        .map_err(|e| DeviceError::PlaybackFailed(format!("{}: {}", path.display(), e)))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| DeviceError::PlaybackFailed(e.to_string()))?;

    let (_stream, stream_handle) =
        OutputStream::try_default().map_err(|e| DeviceError::PlaybackFailed(e.to_string()))?;
    let sink =
        Sink::try_new(&stream_handle).map_err(|e| DeviceError::PlaybackFailed(e.to_string()))?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

fn supports_speech_rate(range: &cpal::SupportedStreamConfigRange) -> bool {
    range.min_sample_rate().0 <= SPEECH_SAMPLE_RATE && range.max_sample_rate().0 >= SPEECH_SAMPLE_RATE
}

/// Average interleaved frames down to one channel
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

fn resample_to_speech_rate(samples: &[i16], source_rate: u32) -> Result<Vec<i16>, DeviceError> {
    if samples.is_empty() {
        return Err(DeviceError::FinalizeFailed("No audio captured".to_string()));
    }
    if source_rate == SPEECH_SAMPLE_RATE {
        return Ok(samples.to_vec());
    }

    let input: Vec<f32> = samples.iter().map(|&s| f32::from(s) / 32768.0).collect();
    let expected_len = (input.len() as f64 * f64::from(SPEECH_SAMPLE_RATE) / f64::from(source_rate))
        .ceil() as usize;

    let mut resampler =
        FftFixedIn::<f32>::new(source_rate as usize, SPEECH_SAMPLE_RATE as usize, 1024, 2, 1)
            .map_err(|e| DeviceError::FinalizeFailed(format!("Resampler init failed: {}", e)))?;

    let mut output = Vec::with_capacity(expected_len);
    let mut pos = 0;
    while pos < input.len() {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(input.len());
        let mut chunk = input[pos..end].to_vec();
        chunk.resize(needed, 0.0);
        let frames = vec![chunk];

        let resampled = resampler
            .process(&frames, None)
            .map_err(|e| DeviceError::FinalizeFailed(format!("Resampling failed: {}", e)))?;
        output.extend(resampled[0].iter().map(|&s| (s * 32767.0) as i16));
        pos = end;
    }
    output.truncate(expected_len);

    Ok(output)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_passes_mono_through() {
        let mono = vec![100i16, 200, 300];
        assert_eq!(downmix(&mono, 1), mono);
    }

    #[test]
    fn downmix_averages_frames() {
        assert_eq!(downmix(&[100, 200, 300, 400], 2), vec![150, 350]);
        assert_eq!(downmix(&[-300, 300, 0, 30, 60, 90], 3), vec![0, 60]);
    }

    #[test]
    fn resample_keeps_speech_rate_input() {
        let samples = vec![1i16, 2, 3];
        assert_eq!(
            resample_to_speech_rate(&samples, SPEECH_SAMPLE_RATE).unwrap(),
            samples
        );
    }

    #[test]
    fn resample_scales_length() {
        let one_second = vec![0i16; 48_000];
        let out = resample_to_speech_rate(&one_second, 48_000).unwrap();
        assert!(out.len() <= SPEECH_SAMPLE_RATE as usize);
        assert!(out.len() > 15_000);
    }

    #[test]
    fn resample_rejects_empty_capture() {
        assert!(matches!(
            resample_to_speech_rate(&[], 48_000),
            Err(DeviceError::FinalizeFailed(_))
        ));
    }

    #[test]
    fn paused_capture_drops_samples() {
        let shared = CaptureShared::new();
        shared.push(&[1, 2]);
        shared.capturing.store(false, Ordering::SeqCst);
        shared.push(&[3, 4]);
        shared.capturing.store(true, Ordering::SeqCst);
        shared.push(&[5]);
        assert_eq!(*lock(&shared.samples), vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn unknown_handle_is_rejected() {
        let device = CpalCaptureDevice::new("/tmp/kronikle-test");
        let stray = CaptureHandle::new(42);
        assert!(matches!(
            device.pause(stray).await,
            Err(DeviceError::InvalidHandle(42))
        ));
        assert!(matches!(
            device.stop_and_finalize(stray).await,
            Err(DeviceError::InvalidHandle(42))
        ));
    }

    #[tokio::test]
    #[ignore = "Requires audio hardware"]
    async fn records_and_finalizes_to_flac() {
        let dir = tempfile::TempDir::new().unwrap();
        let device = CpalCaptureDevice::new(dir.path());

        let handle = device.start().await.unwrap();
        assert!(matches!(device.start().await, Err(DeviceError::ChannelBusy)));
        tokio::time::sleep(StdDuration::from_millis(500)).await;

        let location = device.stop_and_finalize(handle).await.unwrap();
        let bytes = std::fs::read(location.as_str()).unwrap();
        assert_eq!(&bytes[0..4], b"fLaC");
    }
}
