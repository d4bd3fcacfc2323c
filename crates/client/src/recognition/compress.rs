//! Size-tiered upload compression.
//!
//! The codec itself lives behind [`ImageTranscoder`], implemented by the
//! embedding app with whatever the platform provides. This module only
//! decides how hard to compress, and it never fails an upload: no
//! transcoder or a broken one just means the original frame goes up.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::CapturedImage;

/// Frames below this size upload as they are.
const SKIP_BELOW_BYTES: usize = 300_000;
/// Above this, medium compression.
const MEDIUM_BYTES: usize = 500_000;
/// Above this, the strongest compression.
const LARGE_BYTES: usize = 1_000_000;

/// The platform codec rejected the frame.
#[derive(Debug, Error)]
#[error("transcode failed: {0}")]
pub struct TranscodeError(pub String);

/// Re-encodes a frame at a given quality factor.
#[async_trait]
pub trait ImageTranscoder: Send + Sync {
    /// Re-encode `image` at `quality` in `0.0..=1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError`] when the codec cannot process the
    /// frame.
    async fn transcode(
        &self,
        image: &CapturedImage,
        quality: f32,
    ) -> Result<CapturedImage, TranscodeError>;
}

/// Quality factor for a frame of `len` bytes, or `None` when it is small
/// enough to skip compression.
#[must_use]
pub const fn quality_for_size(len: usize) -> Option<f32> {
    if len < SKIP_BELOW_BYTES {
        None
    } else if len > LARGE_BYTES {
        Some(0.5)
    } else if len > MEDIUM_BYTES {
        Some(0.7)
    } else {
        Some(0.8)
    }
}

/// Shrink a frame for upload when a transcoder is available.
pub(crate) async fn compress_for_upload(
    transcoder: Option<&dyn ImageTranscoder>,
    image: CapturedImage,
) -> CapturedImage {
    let Some(quality) = quality_for_size(image.bytes.len()) else {
        debug!(bytes = image.bytes.len(), "frame small enough, skipping compression");
        return image;
    };
    let Some(transcoder) = transcoder else {
        debug!("no transcoder available, uploading original frame");
        return image;
    };
    match transcoder.transcode(&image, quality).await {
        Ok(compressed) => {
            debug!(
                from = image.bytes.len(),
                to = compressed.bytes.len(),
                quality,
                "frame compressed"
            );
            compressed
        }
        Err(e) => {
            warn!(error = %e, "transcode failed, uploading original frame");
            image
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct HalvingTranscoder;

    #[async_trait]
    impl ImageTranscoder for HalvingTranscoder {
        async fn transcode(
            &self,
            image: &CapturedImage,
            _quality: f32,
        ) -> Result<CapturedImage, TranscodeError> {
            let mut bytes = image.bytes.clone();
            bytes.truncate(bytes.len() / 2);
            Ok(CapturedImage {
                bytes,
                mime_type: image.mime_type.clone(),
            })
        }
    }

    struct BrokenTranscoder;

    #[async_trait]
    impl ImageTranscoder for BrokenTranscoder {
        async fn transcode(
            &self,
            _image: &CapturedImage,
            _quality: f32,
        ) -> Result<CapturedImage, TranscodeError> {
            Err(TranscodeError("codec unavailable".to_string()))
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(quality_for_size(0), None);
        assert_eq!(quality_for_size(299_999), None);
        assert_eq!(quality_for_size(300_000), Some(0.8));
        assert_eq!(quality_for_size(500_000), Some(0.8));
        assert_eq!(quality_for_size(500_001), Some(0.7));
        assert_eq!(quality_for_size(1_000_000), Some(0.7));
        assert_eq!(quality_for_size(1_200_000), Some(0.5));
    }

    #[tokio::test]
    async fn test_small_frame_skips_transcoder() {
        let image = CapturedImage::jpeg(vec![0u8; 1000]);
        let out = compress_for_upload(Some(&HalvingTranscoder), image).await;
        assert_eq!(out.bytes.len(), 1000);
    }

    #[tokio::test]
    async fn test_large_frame_gets_compressed() {
        let image = CapturedImage::jpeg(vec![0u8; 1_200_000]);
        let out = compress_for_upload(Some(&HalvingTranscoder), image).await;
        assert_eq!(out.bytes.len(), 600_000);
    }

    #[tokio::test]
    async fn test_missing_transcoder_falls_back_to_original() {
        let image = CapturedImage::jpeg(vec![0u8; 1_200_000]);
        let out = compress_for_upload(None, image).await;
        assert_eq!(out.bytes.len(), 1_200_000);
    }

    #[tokio::test]
    async fn test_broken_transcoder_falls_back_to_original() {
        let image = CapturedImage::jpeg(vec![0u8; 1_200_000]);
        let out = compress_for_upload(Some(&BrokenTranscoder), image).await;
        assert_eq!(out.bytes.len(), 1_200_000);
    }
}
