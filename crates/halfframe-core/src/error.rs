//! Error taxonomy for the grading pipeline.
//!
//! Fatal errors (`PipelineError`) abort a capture job and are converted into
//! "keep the original" at the job boundary. `LutError` never reaches the
//! caller of a compositor job: the transform engine absorbs it by falling back
//! to the stock's colour matrix.

use std::path::PathBuf;

/// Failures while resolving or parsing a 3D LUT.
#[derive(Debug, thiserror::Error)]
pub enum LutError {
    #[error("no LUT registered under `{0}`")]
    NotFound(String),
    #[error("LUT `{reference}` is malformed: expected {expected} samples, found {found}")]
    Malformed {
        reference: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid LUT size: {0}")]
    InvalidSize(String),
    #[error("LUT parse error: {0}")]
    Parse(String),
}

impl LutError {
    /// Attach the LUT reference to a malformed-sample error raised before the
    /// reference was known (e.g. while parsing anonymous text).
    pub(crate) fn with_reference(self, reference: &str) -> Self {
        match self {
            Self::Malformed {
                expected, found, ..
            } => Self::Malformed {
                reference: reference.to_string(),
                expected,
                found,
            },
            other => other,
        }
    }
}

/// Fatal failures of a compositor job.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to decode `{}`: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("cannot allocate a {width}x{height} surface")]
    SurfaceAllocation { width: u32, height: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture job timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("capture worker failed: {0}")]
    Worker(String),
}

/// Invalid film stock registry configuration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("registry contains no film stocks")]
    Empty,
    #[error("duplicate film stock id `{0}`")]
    DuplicateId(String),
    #[error("film stock `{id}`: {reason}")]
    InvalidStock { id: String, reason: String },
    #[error("default film stock `{0}` is not in the registry")]
    UnknownDefault(String),
}

/// A live preview frame could not be filtered. Never propagated past the
/// frame boundary: the frame is passed through unfiltered instead.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("frame buffer is {found} bytes, expected {expected}")]
    FrameSize { expected: usize, found: usize },
    #[error("preview backend does not support the {0} strategy")]
    Unsupported(&'static str),
    #[error("preview backend failure: {0}")]
    Backend(String),
}
