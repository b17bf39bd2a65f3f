//! Base64 audio payloads crossing the provider boundary.
//!
//! Cloud and local TTS services commonly return audio as base64, either raw
//! or wrapped in a data URI (`data:audio/mpeg;base64,...`). When the URI
//! declares a format that differs from the target file's extension, the
//! payload is decoded next to the target and transcoded into place.

use std::path::{Path, PathBuf};

use base64::engine::{general_purpose::STANDARD as BASE64_STANDARD, Engine};
use thiserror::Error;

use crate::media::{MediaError, MediaToolchain};

const DATA_AUDIO_PREFIX: &str = "data:audio/";

/// Errors raised while turning a payload into a file.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The encoded payload was empty.
    #[error("base64 audio payload is empty")]
    Empty,

    /// A data URI without the `,` separating header and data.
    #[error("malformed data URI: missing ',' after header")]
    MalformedDataUri,

    #[error("invalid base64 audio payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to convert decoded audio: {0}")]
    Transcode(#[from] MediaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File extension for an `audio/<subtype>` MIME subtype, if supported.
fn extension_for_subtype(subtype: &str) -> Option<&'static str> {
    match subtype {
        "mpeg" | "mp3" => Some("mp3"),
        "wav" | "x-wav" | "wave" => Some("wav"),
        "ogg" => Some("ogg"),
        "aac" => Some("aac"),
        _ => None,
    }
}

/// `out.wav` + `mp3` → `out.wav.mp3`
fn staging_path(output: &Path, ext: &str) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Decode `encoded` into `output`.
///
/// * Empty input → [`PayloadError::Empty`].
/// * `data:audio/<subtype>;…,<b64>` where `<subtype>` maps to an extension
///   other than `output`'s: the audio is written to `<output>.<ext>`,
///   transcoded into `output` through `media`, and the staging file removed.
/// * Anything else is decoded straight to `output`.
pub async fn decode_audio_payload(
    encoded: &str,
    output: &Path,
    media: &dyn MediaToolchain,
) -> Result<(), PayloadError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(PayloadError::Empty);
    }

    let data = match encoded.strip_prefix(DATA_AUDIO_PREFIX) {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or(PayloadError::MalformedDataUri)?;
            let subtype = header.split(';').next().unwrap_or_default().to_ascii_lowercase();
            let output_ext = output
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();

            if let Some(ext) = extension_for_subtype(&subtype) {
                if ext != output_ext {
                    let bytes = BASE64_STANDARD.decode(data.trim())?;
                    let staging = staging_path(output, ext);
                    tokio::fs::write(&staging, bytes).await?;
                    log::debug!(
                        "payload: converting {} → {}",
                        staging.display(),
                        output.display()
                    );
                    let converted = media.transcode(&staging, output).await;
                    if let Err(e) = tokio::fs::remove_file(&staging).await {
                        log::debug!("payload: could not remove {}: {e}", staging.display());
                    }
                    converted?;
                    return Ok(());
                }
            }
            data
        }
        None => encoded,
    };

    let bytes = BASE64_STANDARD.decode(data.trim())?;
    tokio::fs::write(output, bytes).await?;
    Ok(())
}

/// Read `path` and return it base64-encoded.
///
/// A missing file is not an error: it returns `Ok(None)`.
pub async fn encode_audio_payload(path: &Path) -> std::io::Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(Some(BASE64_STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaCall, MockToolchain};

    const AUDIO: &[u8] = b"ID3\x03fake-mp3-frames";

    fn b64(bytes: &[u8]) -> String {
        BASE64_STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let media = MockToolchain::default();
        let err = decode_audio_payload("", Path::new("/tmp/x.wav"), &media)
            .await
            .unwrap_err();
        assert!(matches!(err, PayloadError::Empty));
    }

    #[tokio::test]
    async fn mismatched_data_uri_is_transcoded() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("line.wav");
        let media = MockToolchain::default();

        let payload = format!("data:audio/mpeg;base64,{}", b64(AUDIO));
        decode_audio_payload(&payload, &output, &media).await.unwrap();

        let staging = dir.path().join("line.wav.mp3");
        assert_eq!(
            media.calls(),
            vec![MediaCall::Transcode(staging.clone(), output.clone())]
        );
        assert_eq!(std::fs::read(&output).unwrap(), AUDIO);
        assert!(!staging.exists(), "staging file must be cleaned up");
    }

    #[tokio::test]
    async fn failed_transcode_still_removes_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("line.wav");
        let media = MockToolchain::failing_transcode();

        let payload = format!("data:audio/mpeg;base64,{}", b64(AUDIO));
        let err = decode_audio_payload(&payload, &output, &media)
            .await
            .unwrap_err();

        assert!(matches!(err, PayloadError::Transcode(_)));
        assert_eq!(media.transcode_count(), 1);
        assert!(!dir.path().join("line.wav.mp3").exists());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn matching_data_uri_is_decoded_directly() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("line.mp3");
        let media = MockToolchain::default();

        let payload = format!("data:audio/mpeg;base64,{}", b64(AUDIO));
        decode_audio_payload(&payload, &output, &media).await.unwrap();

        assert_eq!(media.transcode_count(), 0);
        assert_eq!(std::fs::read(&output).unwrap(), AUDIO);
    }

    #[tokio::test]
    async fn unknown_subtype_is_decoded_directly() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("line.wav");
        let media = MockToolchain::default();

        let payload = format!("data:audio/flac;base64,{}", b64(AUDIO));
        decode_audio_payload(&payload, &output, &media).await.unwrap();

        assert_eq!(media.transcode_count(), 0);
        assert_eq!(std::fs::read(&output).unwrap(), AUDIO);
    }

    #[tokio::test]
    async fn raw_base64_is_decoded_directly() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("line.wav");
        let media = MockToolchain::default();

        decode_audio_payload(&b64(AUDIO), &output, &media).await.unwrap();

        assert_eq!(media.transcode_count(), 0);
        assert_eq!(std::fs::read(&output).unwrap(), AUDIO);
    }

    #[tokio::test]
    async fn data_uri_without_comma_is_malformed() {
        let media = MockToolchain::default();
        let err = decode_audio_payload("data:audio/wav;base64", Path::new("/tmp/x.wav"), &media)
            .await
            .unwrap_err();
        assert!(matches!(err, PayloadError::MalformedDataUri));
    }

    #[tokio::test]
    async fn invalid_base64_is_a_decode_error() {
        let media = MockToolchain::default();
        let err = decode_audio_payload("not base64!!", Path::new("/tmp/x.wav"), &media)
            .await
            .unwrap_err();
        assert!(matches!(err, PayloadError::Decode(_)));
    }

    #[tokio::test]
    async fn encode_missing_path_is_none() {
        let encoded = encode_audio_payload(Path::new("/nonexistent/none.wav"))
            .await
            .unwrap();
        assert!(encoded.is_none());
    }

    #[tokio::test]
    async fn encode_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        std::fs::write(&path, AUDIO).unwrap();

        let encoded = encode_audio_payload(&path).await.unwrap();
        assert_eq!(encoded, Some(b64(AUDIO)));
    }
}
