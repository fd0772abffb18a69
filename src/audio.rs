//! Decoder Adapter (spec §4.1): `path -> PCM | DecodeError`. The
//! core's sole dependency on the outside world for audio. Kept in the
//! teacher's `audio.rs` module, generalised from the teacher's
//! WAV-only `hound` path to also cover other containers via
//! `symphonia`, and to resample non-native rates with `rubato` — the
//! same crate pairing `kannaka-memory`'s `audio` feature bundles
//! (`symphonia` + `rustfft` + `rubato`).

use std::fs::File;
use std::path::Path;

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::SAMPLE_RATE;
use crate::error::DecodeError;

/// Loads audio from `path` and returns mono samples at `SAMPLE_RATE`
/// Hz (spec §4.1).
pub fn decode(path: &Path) -> Result<Vec<f32>, DecodeError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    if is_wav {
        if let Ok(samples) = decode_wav_fast_path(path) {
            return Ok(samples);
        }
        // fall through to symphonia for WAV variants hound doesn't handle
    }
    decode_with_symphonia(path)
}

fn decode_wav_fast_path(path: &Path) -> Result<Vec<f32>, DecodeError> {
    let mut reader = hound::WavReader::open(path).map_err(|_| DecodeError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let spec = reader.spec();

    let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => reader.samples::<i16>().map(|s| s.map(|s| s as f32 / i16::MAX as f32)).collect(),
            24 => reader.samples::<i32>().map(|s| s.map(|s| s as f32 / (1 << 23) as f32)).collect(),
            32 => reader.samples::<i32>().map(|s| s.map(|s| s as f32 / i32::MAX as f32)).collect(),
            _ => {
                return Err(DecodeError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        },
    };
    let samples = samples.map_err(|e| DecodeError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
    })?;

    let mono = to_mono(samples, spec.channels as usize);
    resample_if_needed(mono, spec.sample_rate, path)
}

fn decode_with_symphonia(path: &Path) -> Result<Vec<f32>, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|_| DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?
        .clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|_| DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

    let native_rate = track.codec_params.sample_rate.unwrap_or(SAMPLE_RATE);
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(_) => break,
        };
        match decoder.decode(&packet) {
            Ok(decoded) => append_interleaved(&decoded, &mut samples),
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(_) => break,
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let mono = to_mono(samples, channels.max(1));
    resample_if_needed(mono, native_rate, path)
}

fn append_interleaved(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave(buf, out),
        AudioBufferRef::S32(buf) => interleave(buf, out),
        AudioBufferRef::S16(buf) => interleave(buf, out),
        AudioBufferRef::U8(buf) => interleave(buf, out),
        _ => {}
    }
}

fn interleave<S>(buf: &symphonia::core::audio::AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: symphonia::core::sample::Sample + symphonia::core::conv::IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    for frame in 0..frames {
        for ch in 0..channels {
            out.push(symphonia::core::conv::IntoSample::<f32>::into_sample(
                buf.chan(ch)[frame],
            ));
        }
    }
}

fn to_mono(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

/// Resamples `samples` from `source_rate` to `SAMPLE_RATE`. A resampler
/// failure is a decode failure, not a silent pass-through: returning
/// audio at the wrong rate would violate the Decoder Adapter's "mono
/// samples at 22050 Hz" contract and corrupt every downstream DSP stage
/// (spec §4.1), so any `rubato` error is reported to the caller, who
/// skips the file per spec §4.7/§7.
fn resample_if_needed(
    samples: Vec<f32>,
    source_rate: u32,
    path: &Path,
) -> Result<Vec<f32>, DecodeError> {
    if source_rate == SAMPLE_RATE || samples.is_empty() {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = SAMPLE_RATE as f64 / source_rate as f64;
    let resample_error = || DecodeError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("failed to resample from {source_rate} Hz to {SAMPLE_RATE} Hz"),
        ),
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|_| resample_error())?;

    let mut out = resampler
        .process(&[samples], None)
        .map_err(|_| resample_error())?;
    Ok(out.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_wav(path: &Path, sample_rate: u32, freq: f32, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let n = (sample_rate as f32 * seconds) as usize;
        for i in 0..n {
            let t = i as f32 / sample_rate as f32;
            let sample = (t * freq * 2.0 * std::f32::consts::PI).sin();
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_native_rate_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, SAMPLE_RATE, 440.0, 1.0);

        let pcm = decode(&path).unwrap();
        assert!(!pcm.is_empty());
    }

    #[test]
    fn resamples_non_native_rate_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone_44100.wav");
        write_test_wav(&path, 44100, 440.0, 1.0);

        let pcm = decode(&path).unwrap();
        let expected = SAMPLE_RATE as f32 * 1.0;
        assert!((pcm.len() as f32 - expected).abs() / expected < 0.1);
    }

    #[test]
    fn unsupported_format_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_audio.bin");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"not an audio file at all").unwrap();
        drop(f);

        assert!(matches!(decode(&path), Err(DecodeError::UnsupportedFormat { .. })));
    }
}
