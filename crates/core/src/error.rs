//! Error types for deck loading and export.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or exporting a deck.
///
/// Navigation never produces one of these; out-of-range moves are ignored.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse the PPTX file structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// The document was readable but contained no slides.
    #[error("No slides found in {0}")]
    EmptyDeck(String),

    /// Export snapshot could not be serialized.
    #[error("Failed to serialize export: {0}")]
    SerializeError(#[from] serde_json::Error),
}
