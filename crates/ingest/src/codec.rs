//! Line-framed sample protocol spoken by the capture process.
//!
//! ```text
//! DATA:{"MouthTopY":0.41,"MouthBotY":0.47,...}\n
//! IMAGE:<byte count>\n<raw bytes>
//! {"MouthTopY":0.41,...}\n            (legacy, plain JSON)
//! ```

use std::io::{BufRead, Read};

use headput_common::error::{HeadputError, HeadputResult};
use headput_face_model::MeasurementSample;

/// Longest header line accepted before the client is dropped.
pub const MAX_LINE_LEN: usize = 64 * 1024;

const DATA_PREFIX: &str = "DATA:";
const IMAGE_PREFIX: &str = "IMAGE:";

/// One decoded header line.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Sample(MeasurementSample),
    /// A preview image of `len` bytes follows the header.
    Image { len: usize },
    /// Nothing usable on this line.
    Skip,
}

/// Decode one header line (without its trailing newline).
pub fn decode_line(line: &str) -> Frame {
    let line = line.trim_end();
    if line.is_empty() {
        return Frame::Skip;
    }

    if let Some(json) = line.strip_prefix(DATA_PREFIX) {
        return match serde_json::from_str(json) {
            Ok(sample) => Frame::Sample(sample),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed DATA frame");
                Frame::Skip
            }
        };
    }

    if let Some(len) = line.strip_prefix(IMAGE_PREFIX) {
        return match len.trim().parse() {
            Ok(len) => Frame::Image { len },
            Err(_) => {
                tracing::debug!(header = %line, "Skipping IMAGE frame with bad length");
                Frame::Skip
            }
        };
    }

    match serde_json::from_str(line) {
        Ok(sample) => Frame::Sample(sample),
        Err(_) => {
            tracing::debug!("Skipping unrecognised line");
            Frame::Skip
        }
    }
}

/// Encode a sample as a `DATA:` line, newline included.
pub fn encode_sample(sample: &MeasurementSample) -> HeadputResult<String> {
    Ok(format!("{DATA_PREFIX}{}\n", serde_json::to_string(sample)?))
}

/// Read every sample from a recorded stream, discarding image payloads.
pub fn read_samples<R: BufRead>(mut reader: R) -> HeadputResult<Vec<MeasurementSample>> {
    let mut samples = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .by_ref()
            .take(MAX_LINE_LEN as u64 + 1)
            .read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        if line.len() > MAX_LINE_LEN {
            return Err(HeadputError::ingest(format!(
                "Line of {} bytes exceeds the {MAX_LINE_LEN} byte limit",
                line.len()
            )));
        }

        match decode_line(&String::from_utf8_lossy(&line)) {
            Frame::Sample(sample) => samples.push(sample),
            Frame::Image { len } => {
                let skipped =
                    std::io::copy(&mut reader.by_ref().take(len as u64), &mut std::io::sink())?;
                if skipped < len as u64 {
                    return Err(HeadputError::ingest(format!(
                        "Image frame truncated: expected {len} bytes, got {skipped}"
                    )));
                }
            }
            Frame::Skip => {}
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_frame() {
        let frame = decode_line(r#"DATA:{"MouthTopY":0.5,"MouthBotY":1.5,"lEarZ":-0.1}"#);
        let Frame::Sample(sample) = frame else {
            panic!("expected a sample, got {frame:?}");
        };
        assert_eq!(sample.mouth_height(), 1.0);
        assert_eq!(sample.left_ear_z, -0.1);
    }

    #[test]
    fn test_decode_image_header() {
        assert_eq!(decode_line("IMAGE:2048\r"), Frame::Image { len: 2048 });
        assert_eq!(decode_line("IMAGE:lots"), Frame::Skip);
    }

    #[test]
    fn test_decode_legacy_and_garbage() {
        assert!(matches!(
            decode_line(r#"{"X":0.25}"#),
            Frame::Sample(sample) if sample.nose_x == 0.25
        ));
        assert_eq!(decode_line("hello"), Frame::Skip);
        assert_eq!(decode_line("DATA:{broken"), Frame::Skip);
        assert_eq!(decode_line(""), Frame::Skip);
    }

    #[test]
    fn test_read_samples_skips_images() {
        let first = MeasurementSample {
            mouth_bottom_y: 1.0,
            ..Default::default()
        };
        let mut stream = encode_sample(&first).unwrap().into_bytes();
        stream.extend_from_slice(b"IMAGE:5\n\x89PNG\n");
        stream.extend_from_slice(b"noise\n");
        stream.extend_from_slice(br#"{"MouthTopY":0.2}"#);

        let samples = read_samples(stream.as_slice()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], first);
        assert_eq!(samples[1].mouth_top_y, 0.2);
    }

    #[test]
    fn test_unterminated_long_line_is_an_error() {
        let stream = vec![b'x'; MAX_LINE_LEN * 4];
        assert!(read_samples(stream.as_slice()).is_err());
    }

    #[test]
    fn test_truncated_image_is_an_error() {
        let stream = b"IMAGE:10\nabc".to_vec();
        assert!(read_samples(stream.as_slice()).is_err());
    }
}
