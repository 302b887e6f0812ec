//! Concatenation of a track's WAV segments into one artifact.
//!
//! The provider returns the initial generation and every extension as
//! separate files. When all segments share one PCM layout they are joined
//! in playback order; anything else leaves the segments untouched.

use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use hound::{WavReader, WavSpec, WavWriter};
use songbatch_core::duration::ArtifactKind;
use songbatch_core::naming::stitched_filename;
use songbatch_core::types::DbId;

/// Reasons a track's segments were not stitched.
#[derive(Debug, thiserror::Error)]
pub enum StitchError {
    #[error("Need at least two segments, got {0}")]
    TooFewSegments(usize),

    #[error("Segment {} is not a WAV file", .0.display())]
    NotWav(PathBuf),

    #[error("Segment {} has format {found:?}, expected {expected:?}", .path.display())]
    FormatMismatch {
        path: PathBuf,
        expected: WavSpec,
        found: WavSpec,
    },

    #[error("WAV error in {}: {source}", .path.display())]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stitch task failed: {0}")]
    Task(String),
}

/// Writes stitched artifacts into the output directory.
#[derive(Debug, Clone)]
pub struct Stitcher {
    output_dir: PathBuf,
}

impl Stitcher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Join `segments` into `<output_dir>/track_<id>_full.wav` on the
    /// blocking pool. Returns the stitched path.
    pub async fn stitch(
        &self,
        track_id: DbId,
        segments: Vec<PathBuf>,
    ) -> Result<PathBuf, StitchError> {
        let output = self.output_dir.join(stitched_filename(track_id));
        tokio::task::spawn_blocking(move || {
            concat_wav_segments(&segments, &output)?;
            Ok::<_, StitchError>(output)
        })
        .await
        .map_err(|e| StitchError::Task(e.to_string()))?
    }
}

/// Concatenate WAV `segments` into `output`, returning the number of
/// samples written.
///
/// All segments must have identical channel count, sample rate, bit depth
/// and sample format. The output is written to a sibling temporary file and
/// renamed into place, so a failed stitch never leaves a partial artifact.
pub fn concat_wav_segments(segments: &[PathBuf], output: &Path) -> Result<u64, StitchError> {
    if segments.len() < 2 {
        return Err(StitchError::TooFewSegments(segments.len()));
    }

    let mut readers = Vec::with_capacity(segments.len());
    for path in segments {
        if ArtifactKind::from_path(path) != ArtifactKind::Wav {
            return Err(StitchError::NotWav(path.clone()));
        }
        let reader = WavReader::open(path).map_err(|source| StitchError::Wav {
            path: path.clone(),
            source,
        })?;
        readers.push((path, reader));
    }

    let expected = readers[0].1.spec();
    for (path, reader) in &readers[1..] {
        let found = reader.spec();
        if found != expected {
            return Err(StitchError::FormatMismatch {
                path: (*path).clone(),
                expected,
                found,
            });
        }
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = output.with_extension("wav.part");
    let result = write_all(&mut readers, &partial, expected);
    match result {
        Ok(samples) => {
            fs::rename(&partial, output)?;
            Ok(samples)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn write_all<R: Read>(
    readers: &mut [(&PathBuf, WavReader<R>)],
    output: &Path,
    spec: WavSpec,
) -> Result<u64, StitchError> {
    let wav_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: hound::Error| StitchError::Wav { path, source }
    };

    let mut writer = WavWriter::create(output, spec).map_err(wav_err(output))?;
    let mut total = 0;
    for (path, reader) in readers.iter_mut() {
        total += match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, _) => copy_samples::<f32, _, _>(reader, &mut writer),
            (hound::SampleFormat::Int, 1..=8) => copy_samples::<i8, _, _>(reader, &mut writer),
            (hound::SampleFormat::Int, 9..=16) => copy_samples::<i16, _, _>(reader, &mut writer),
            (hound::SampleFormat::Int, _) => copy_samples::<i32, _, _>(reader, &mut writer),
        }
        .map_err(wav_err(path.as_path()))?;
    }
    writer.finalize().map_err(wav_err(output))?;
    Ok(total)
}

fn copy_samples<S, R, W>(
    reader: &mut WavReader<R>,
    writer: &mut WavWriter<W>,
) -> Result<u64, hound::Error>
where
    S: hound::Sample,
    R: Read,
    W: Write + Seek,
{
    let mut written = 0;
    for sample in reader.samples::<S>() {
        writer.write_sample(sample?)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn spec(sample_rate: u32) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn write_wav(path: &Path, spec: WavSpec, samples: &[i16]) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn segments_are_joined_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b_ext.wav");
        write_wav(&a, spec(8_000), &[1, 2, 3]);
        write_wav(&b, spec(8_000), &[4, 5]);
        let out = dir.path().join("full.wav");

        let written = concat_wav_segments(&[a, b], &out).unwrap();

        assert_eq!(written, 5);
        let mut reader = WavReader::open(&out).unwrap();
        assert_eq!(reader.spec(), spec(8_000));
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, [1, 2, 3, 4, 5]);
        assert!(!dir.path().join("full.wav.part").exists());
    }

    #[test]
    fn mismatched_formats_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, spec(8_000), &[1]);
        write_wav(&b, spec(16_000), &[2]);
        let out = dir.path().join("full.wav");

        assert_matches!(
            concat_wav_segments(&[a, b], &out),
            Err(StitchError::FormatMismatch { .. })
        );
        assert!(!out.exists());
    }

    #[test]
    fn compressed_segments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        write_wav(&a, spec(8_000), &[1]);
        let b = dir.path().join("b.mp3");
        fs::write(&b, b"not a wav").unwrap();

        assert_matches!(
            concat_wav_segments(&[a, b], &dir.path().join("full.wav")),
            Err(StitchError::NotWav(_))
        );
    }

    #[test]
    fn missing_segment_is_a_wav_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        write_wav(&a, spec(8_000), &[1]);

        assert_matches!(
            concat_wav_segments(&[a, dir.path().join("gone.wav")], &dir.path().join("o.wav")),
            Err(StitchError::Wav { .. })
        );
    }

    #[test]
    fn single_segment_is_not_stitched() {
        assert_matches!(
            concat_wav_segments(&[PathBuf::from("a.wav")], Path::new("o.wav")),
            Err(StitchError::TooFewSegments(1))
        );
    }

    #[tokio::test]
    async fn stitcher_names_output_after_track() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, spec(8_000), &[1]);
        write_wav(&b, spec(8_000), &[2]);

        let path = Stitcher::new(dir.path()).stitch(9, vec![a, b]).await.unwrap();

        assert_eq!(path, dir.path().join("track_9_full.wav"));
        assert!(path.exists());
    }
}
