use thiserror::Error;

/// Errors from a coordinated load. `E` is the error of the load itself.
#[derive(Debug, Error)]
pub enum CoordError<E> {
    /// The calling thread is already loading this name.
    #[error("circular load of {name}")]
    Circularity { name: String },

    /// The load ran and failed.
    #[error("{0}")]
    Load(E),
}

impl<E> CoordError<E> {
    pub fn is_circularity(&self) -> bool {
        matches!(self, CoordError::Circularity { .. })
    }

    /// The load's own error, if the load ran.
    pub fn into_load(self) -> Option<E> {
        match self {
            CoordError::Load(e) => Some(e),
            CoordError::Circularity { .. } => None,
        }
    }
}

/// Result alias for coordinated loads.
pub type CoordResult<T, E> = Result<T, CoordError<E>>;
