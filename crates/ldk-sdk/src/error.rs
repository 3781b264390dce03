use ldk_coord::CoordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("circular load of class {0}")]
    Circularity(String),

    #[error("loading context {0} is closed")]
    Closed(String),

    #[error("classpath error: {0}")]
    Classpath(#[from] ldk_classpath::ClasspathError),

    #[error("native library error: {0}")]
    Native(#[from] ldk_native::NativeError),

    #[error("invalid location: {0}")]
    Location(#[from] ldk_types::TypeError),
}

impl From<CoordError<SdkError>> for SdkError {
    fn from(e: CoordError<SdkError>) -> Self {
        match e {
            CoordError::Circularity { name } => SdkError::Circularity(name),
            CoordError::Load(e) => e,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
