pub mod artifactory;
mod cache;
mod models;
mod reconcile;

pub use cache::CatalogCache;
pub use models::{RepositoryListItem, VirtualRepository};
pub use reconcile::reconcile;

/// ---- Errors ----
#[derive(thiserror::Error, Debug)]
pub enum ReposError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
