//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionProgress, ConversionResult, MediaInfo};

/// A converter that can transcode media files.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError>;

    /// Converts a media file according to the job specification.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError>;

    /// Converts a media file with progress reporting.
    ///
    /// The progress sender will receive updates during conversion.
    /// If the sender is dropped, conversion continues without progress reporting.
    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Returns the supported input formats.
    fn supported_input_formats(&self) -> &[&str] {
        // Common formats supported by ffmpeg
        &[
            // Audio
            "flac", "mp3", "m4a", "aac", "ogg", "opus", "wav", "wma", "ape", "alac",
            // Video
            "mkv", "mp4", "avi", "mov", "wmv", "webm", "ts", "m2ts",
        ]
    }

    /// Returns the supported output formats.
    fn supported_output_formats(&self) -> &[&str] {
        &[
            // Audio
            "flac", "mp3", "m4a", "ogg", "opus", "wav",
            // Video
            "mkv", "mp4", "webm",
        ]
    }
}
