use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build the search thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
