use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("unmatched data argument: key/value pairs must have even length, got {0} items")]
    UnmatchedData(usize),
    #[error("no open event on this thread: {0}")]
    NoOpenEvent(&'static str),
    #[error("event handle used on a thread other than the one that started it")]
    WrongThread,
    #[error("time source '{0}' is not available on this platform")]
    ClockUnavailable(&'static str),
    #[error("trace sink error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;

pub(crate) fn check_pairs(data: &[&str]) -> Result<()> {
    if data.len() % 2 == 1 {
        return Err(TraceError::UnmatchedData(data.len()));
    }
    Ok(())
}
