use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to open or navigate to a document.
///
/// A failed operation leaves the current document and history untouched.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot resolve link target `{target}`")]
    Unresolvable { target: String },
    #[error("cannot go {0}: no more history")]
    History(&'static str),
}

/// Why an image ended in the failed state.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot resolve image `{0}`")]
    Unresolvable(String),
    #[error("failed to read image {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image worker for {} stopped without a result", path.display())]
    Worker { path: PathBuf },
}
