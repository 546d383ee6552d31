//! Capture job boundary.
//!
//! Fatal pipeline errors stop here and turn into "keep the original": a
//! capture never loses the user's photo because grading failed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::compositor::{FrameCompositor, ProcessedImageResult, ProcessingOptions};
use crate::error::PipelineError;

/// What the capture flow ends up saving.
#[derive(Debug)]
pub enum CaptureOutcome {
    Processed(ProcessedImageResult),
    /// Grading failed; the untouched original stands in.
    Unprocessed {
        original: PathBuf,
        reason: PipelineError,
    },
}

impl CaptureOutcome {
    /// The file to hand to the gallery.
    pub fn path(&self) -> &Path {
        match self {
            Self::Processed(result) => &result.path,
            Self::Unprocessed { original, .. } => original,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }

    fn from_result(source: &Path, result: Result<ProcessedImageResult, PipelineError>) -> Self {
        match result {
            Ok(processed) => Self::Processed(processed),
            Err(reason) => {
                tracing::error!(
                    source = %source.display(),
                    "capture processing failed, keeping original: {reason}"
                );
                Self::Unprocessed {
                    original: source.to_path_buf(),
                    reason,
                }
            }
        }
    }
}

impl FrameCompositor {
    /// [`process`](Self::process), with failures converted to
    /// [`CaptureOutcome::Unprocessed`].
    pub fn capture(&self, source: &Path, options: &ProcessingOptions) -> CaptureOutcome {
        CaptureOutcome::from_result(source, self.process(source, options))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("a capture is already being processed")]
    Busy,
}

/// Runs capture jobs off the async runtime's worker threads, one at a time.
///
/// A submission while another job is in flight is rejected rather than
/// queued. With a timeout, a slow job yields the original to the caller; the
/// job itself keeps running and the worker stays busy until it finishes.
#[derive(Debug, Clone)]
pub struct CaptureWorker {
    compositor: FrameCompositor,
    in_flight: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl CaptureWorker {
    pub fn new(compositor: FrameCompositor, timeout: Option<Duration>) -> Self {
        Self {
            compositor,
            in_flight: Arc::new(Semaphore::new(1)),
            timeout,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.available_permits() == 0
    }

    /// Process `source` on the blocking pool.
    pub async fn submit(
        &self,
        source: PathBuf,
        options: ProcessingOptions,
    ) -> Result<CaptureOutcome, SubmitError> {
        let permit = self
            .in_flight
            .clone()
            .try_acquire_owned()
            .map_err(|_| SubmitError::Busy)?;

        let compositor = self.compositor.clone();
        let job_source = source.clone();
        let job = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            compositor.process(&job_source, &options)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, job).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Ok(CaptureOutcome::from_result(&source, Err(PipelineError::Timeout(limit))));
                }
            },
            None => job.await,
        };

        let result = joined.map_err(|e| PipelineError::Worker(e.to_string())).and_then(|r| r);
        Ok(CaptureOutcome::from_result(&source, result))
    }
}
