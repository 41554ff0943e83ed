//! RIFF/WAVE IEEE-float PCM I/O. The only file-format concern this crate
//! has: every other byte buffer in the codec is just `f64`/`f32` samples.

use std::path::Path;

use hound::{SampleFormat, WavSpec};

use crate::error::WatermarkError;

/// Two channels of float samples, always populated even for mono input
/// (the mono channel is duplicated into both so the rest of the codec never
/// special-cases channel count).
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

pub struct WavAudio {
    pub buffer: StereoBuffer,
    pub sample_rate: u32,
    pub channels: u16,
}

fn io_err(path: &Path, source: std::io::Error) -> WatermarkError {
    WatermarkError::IoFailureAt {
        path: path.display().to_string(),
        source,
    }
}

fn hound_err(path: &Path, err: hound::Error) -> WatermarkError {
    match err {
        hound::Error::IoError(e) => io_err(path, e),
        other => WatermarkError::FormatMismatch {
            expected: "IEEE float 32-bit WAV".to_string(),
            actual: other.to_string(),
        },
    }
}

/// Read a WAV file, validating it is 32-bit IEEE float with 1 or 2
/// channels. If `expected_sample_rate`/`expected_channels` are given and
/// disagree with the file header, returns `FormatMismatch`.
pub fn read(
    path: &Path,
    expected_sample_rate: Option<u32>,
    expected_channels: Option<u16>,
) -> Result<WavAudio, WatermarkError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| hound_err(path, e))?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Float || spec.bits_per_sample != 32 {
        return Err(WatermarkError::FormatMismatch {
            expected: "IEEE float, 32 bits/sample".to_string(),
            actual: format!("{:?}, {} bits/sample", spec.sample_format, spec.bits_per_sample),
        });
    }
    if spec.channels != 1 && spec.channels != 2 {
        return Err(WatermarkError::FormatMismatch {
            expected: "1 or 2 channels".to_string(),
            actual: format!("{} channels", spec.channels),
        });
    }
    if let Some(expected) = expected_sample_rate {
        if spec.sample_rate != expected {
            return Err(WatermarkError::FormatMismatch {
                expected: format!("sample_rate {expected}"),
                actual: format!("sample_rate {}", spec.sample_rate),
            });
        }
    }
    if let Some(expected) = expected_channels {
        if spec.channels != expected {
            return Err(WatermarkError::FormatMismatch {
                expected: format!("{expected} channels"),
                actual: format!("{} channels", spec.channels),
            });
        }
    }

    let samples: Vec<f32> = reader
        .samples::<f32>()
        .collect::<Result<_, _>>()
        .map_err(|e| hound_err(path, e))?;

    let (left, right) = if spec.channels == 2 {
        let mut left = Vec::with_capacity(samples.len() / 2);
        let mut right = Vec::with_capacity(samples.len() / 2);
        for chunk in samples.chunks_exact(2) {
            left.push(chunk[0]);
            right.push(chunk[1]);
        }
        (left, right)
    } else {
        (samples.clone(), samples)
    };

    Ok(WavAudio {
        buffer: StereoBuffer { left, right },
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Write `buffer` back out as a WAV with the given channel count
/// (1 collapses back to the left channel, which embedding keeps identical
/// to the right channel for mono sources) and sample rate. Writes to a
/// sibling temp file and renames over `path` only once the writer has
/// flushed successfully, so a crash mid-write never leaves a partial file.
pub fn write(path: &Path, buffer: &StereoBuffer, sample_rate: u32, channels: u16) -> Result<(), WatermarkError> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let tmp_path = path.with_extension("wav.tmp");
    {
        let mut writer = hound::WavWriter::create(&tmp_path, spec).map_err(|e| hound_err(&tmp_path, e))?;
        if channels == 2 {
            for (&l, &r) in buffer.left.iter().zip(buffer.right.iter()) {
                writer.write_sample(l).map_err(|e| hound_err(&tmp_path, e))?;
                writer.write_sample(r).map_err(|e| hound_err(&tmp_path, e))?;
            }
        } else {
            for &l in buffer.left.iter() {
                writer.write_sample(l).map_err(|e| hound_err(&tmp_path, e))?;
            }
        }
        writer.finalize().map_err(|e| hound_err(&tmp_path, e))?;
    }

    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
