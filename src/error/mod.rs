use crate::catalog::CatalogError;
use crate::generation::GenerationError;
use crate::session::SessionError;
use crate::state::StateError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to read image dimensions: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
