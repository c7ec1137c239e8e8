use thiserror::Error;

/// Type alias of the [`Result`] type specific to `sea-loader`.
pub type LoadResult<T, E> = std::result::Result<T, LoadErr<E>>;

#[derive(Error, Debug)]
/// Common errors that may occur. None of them is recoverable: the pipeline stops at the first one.
pub enum LoadErr<E: std::error::Error> {
    #[error("Batch size cannot be less than 1")]
    BatchSizeZero,
    #[error("There must be at least one channel")]
    NoChannel,
    #[error("There must be at least one worker")]
    NoWorker,
    #[error("Channel capacity cannot be less than 1")]
    ChannelCapacityZero,
    #[error("Meta field batching is enabled, but the meta field is not set")]
    MetaFieldNotSet,
    #[error("Worker {0} has hung up")]
    WorkerDead(usize),
    #[error("Backend error: {0}")]
    Backend(E),
    #[error("Runtime error: {0}")]
    Runtime(Box<dyn std::error::Error + Send + Sync>),
}

/// Function to construct a [`LoadErr::Runtime`] error variant.
pub fn runtime_error<T: std::error::Error, E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> LoadErr<T> {
    LoadErr::Runtime(Box::new(e))
}

impl<E: std::error::Error> LoadErr<E> {
    /// Whether this error is caused by invalid configuration, as opposed to bad data or a dead worker.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::BatchSizeZero
                | Self::NoChannel
                | Self::NoWorker
                | Self::ChannelCapacityZero
                | Self::MetaFieldNotSet
        )
    }
}
