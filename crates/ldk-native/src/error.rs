use std::path::PathBuf;

use thiserror::Error;

use crate::owner::OwnerId;

/// Errors from native library loading.
#[derive(Debug, Error)]
pub enum NativeError {
    /// The library name is registered to a different owner.
    #[error("native library {name} already loaded by owner {owner}")]
    AlreadyLoadedElsewhere { name: String, owner: OwnerId },

    /// The library is being opened on this thread on behalf of a different
    /// owner.
    #[error("native library {name} is being loaded by owner {owner}")]
    InProgressElsewhere { name: String, owner: OwnerId },

    /// A load was requested from inside the unload of the same library.
    #[error("native library {name} is being unloaded")]
    UnloadInProgress { name: String },

    /// No candidate file exists on any search path.
    #[error("no native library {name} found")]
    NotFound { name: String },

    /// A library finder returned a relative path.
    #[error("library finder for {name} returned a relative path: {}", path.display())]
    NotAbsolute { name: String, path: PathBuf },

    /// The platform open (or the library's load hook) failed.
    #[error("cannot open native library {name}: {reason}")]
    Open { name: String, reason: String },

    /// The platform close failed.
    #[error("cannot close native library {name}: {reason}")]
    Close { name: String, reason: String },

    /// The handle was not obtained from this registry.
    #[error("library handle {} does not belong to this registry", path.display())]
    ForeignHandle { path: PathBuf },

    /// The library has already been unloaded.
    #[error("native library {name} is already unloaded")]
    Unloaded { name: String },
}

/// Result alias for native library operations.
pub type NativeResult<T> = Result<T, NativeError>;
