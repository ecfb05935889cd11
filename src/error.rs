pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("task queue is at capacity")]
    TooManyTasks,

    #[error("pool still has queued or in-flight tasks")]
    HasTasks,

    #[error("task has not been pushed to a pool")]
    TaskNotPushed,

    #[error("task is still queued or running in a pool")]
    TaskInPool,

    #[error("timed out waiting for task completion")]
    Timeout,

    #[error("task panicked: {0}")]
    TaskPanicked(String),
}

impl Error {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
