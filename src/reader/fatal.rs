//! Turn fatal open failures into a process exit

use crate::reader::{Reader, ReaderError, ReaderGuard};
use crate::stream::Stream;

/// Open failure that should end the process
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct FatalExit {
    #[source]
    error: ReaderError,
}

impl FatalExit {
    pub fn error(&self) -> &ReaderError {
        &self.error
    }

    pub fn into_error(self) -> ReaderError {
        self.error
    }

    /// Process exit status
    pub fn code(&self) -> i32 {
        match self.error {
            ReaderError::UnableToRead { .. } => 1,
            ReaderError::Cancelled => 130,
            _ => 2,
        }
    }

    /// Log the failure and terminate the process
    pub fn exit(self) -> ! {
        let code = self.code();
        if !self.error.is_silent() {
            log::error!("{}", self.error);
        }
        std::process::exit(code)
    }
}

impl From<ReaderError> for FatalExit {
    fn from(error: ReaderError) -> Self {
        Self { error }
    }
}

/// Open `reader`, converting a failure into a [`FatalExit`]
pub fn open_or_fatal<S: Stream>(reader: &mut Reader<S>) -> Result<ReaderGuard<'_, S>, FatalExit> {
    reader.open().map_err(FatalExit::from)
}

/// Open `reader` or exit the process
pub fn exit_on_fail<S: Stream>(reader: &mut Reader<S>) -> ReaderGuard<'_, S> {
    match open_or_fatal(reader) {
        Ok(guard) => guard,
        Err(fatal) => fatal.exit(),
    }
}
