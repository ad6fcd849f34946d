//! Demo audio source reading a WAV file and feeding it to the pipeline at
//! (optionally accelerated) real time. Stands in for the out-of-scope OS
//! capture collaborator so the binary is runnable end-to-end without real
//! hardware (spec.md §1, §10.4).

use chyron_foundation::error::AudioSourceError;
use hound::WavReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

const SAMPLE_RATE_HZ: u32 = 16_000;
/// 0.1s chunks keep level updates responsive without flooding the buffer.
const CHUNK_SAMPLES: usize = 1_600;

pub struct DemoAudioSource {
    path: std::path::PathBuf,
    speed_multiplier: f64,
    stop: Arc<Notify>,
    stopped: Arc<AtomicBool>,
}

impl DemoAudioSource {
    pub fn new(path: impl AsRef<Path>, speed_multiplier: f64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            speed_multiplier: speed_multiplier.max(0.01),
            stop: Arc::new(Notify::new()),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Streams 16 kHz mono S16LE chunks to `on_data` and a peak-amplitude
    /// level in `[0, 1]` to `on_level`, pacing delivery to each chunk's
    /// real-time duration divided by `speed_multiplier`.
    pub fn start<D, L>(
        &self,
        mut on_data: D,
        mut on_level: L,
    ) -> Result<JoinHandle<()>, AudioSourceError>
    where
        D: FnMut(&[u8]) + Send + 'static,
        L: FnMut(f32) + Send + 'static,
    {
        let reader =
            WavReader::open(&self.path).map_err(|e| AudioSourceError::StartFailed(e.to_string()))?;
        let spec = reader.spec();
        if spec.sample_rate != SAMPLE_RATE_HZ || spec.channels != 1 || spec.bits_per_sample != 16 {
            return Err(AudioSourceError::FormatNotSupported {
                format: format!(
                    "{}Hz {}ch {}bit (expected 16000Hz mono 16-bit)",
                    spec.sample_rate, spec.channels, spec.bits_per_sample
                ),
            });
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioSourceError::StartFailed(e.to_string()))?;

        let stop = self.stop.clone();
        let stopped = self.stopped.clone();
        let chunk_duration = Duration::from_secs_f64(
            CHUNK_SAMPLES as f64 / SAMPLE_RATE_HZ as f64 / self.speed_multiplier,
        );

        let handle = tokio::spawn(async move {
            for chunk in samples.chunks(CHUNK_SAMPLES) {
                if stopped.load(Ordering::Relaxed) {
                    break;
                }
                let bytes: Vec<u8> = chunk.iter().flat_map(|s| s.to_le_bytes()).collect();
                let peak = chunk.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
                on_data(&bytes);
                on_level(peak as f32 / i16::MAX as f32);

                tokio::select! {
                    _ = tokio::time::sleep(chunk_duration) => {}
                    _ = stop.notified() => break,
                }
            }
        });
        Ok(handle)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        self.stop.notify_waiters();
    }
}
