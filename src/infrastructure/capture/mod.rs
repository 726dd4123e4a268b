//! Audio capture adapters
//!
//! Captures from the default input device with cpal, mixes down to mono,
//! resamples to 16 kHz and writes each finalized recording as a FLAC file.

mod cpal_device;
mod encoder;

pub use cpal_device::CpalCaptureDevice;
pub use encoder::{encode_flac, EncodingError, SPEECH_SAMPLE_RATE};
