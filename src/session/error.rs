use thiserror::Error;

use crate::catalog::CatalogError;
use crate::generation::GenerationError;
use crate::state::StateError;

use super::crop::CropError;

/// Readiness preconditions a user action did not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionIssue {
    MissingPrompt,
    MissingHotspot,
    NotInstant(String),
    UnknownStyle { feature: String, style: String },
}

impl std::fmt::Display for SelectionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPrompt => f.write_str("Please enter a description or location."),
            Self::MissingHotspot => f.write_str(
                "Please click on the image to select an area to edit for this feature.",
            ),
            Self::NotInstant(name) => write!(f, "{name} cannot be applied instantly."),
            Self::UnknownStyle { feature, style } => {
                write!(f, "{feature} does not offer the style {style}.")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidSelection(SelectionIssue),
    #[error("No image loaded to edit.")]
    NoImageLoaded,
    #[error("No crop selection has been made.")]
    NoCropSelected,
    #[error("a generation is already in progress")]
    GenerationInFlight,
    #[error("Failed to generate the image. {0}")]
    Generation(#[from] GenerationError),
    #[error("Failed to crop the image. {0}")]
    Crop(#[from] CropError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    State(#[from] StateError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
