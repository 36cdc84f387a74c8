//! Core shared errors (renderer-agnostic).

use thiserror::Error;

use crate::loading::LoadId;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown tunable parameter '{0}'")]
    UnknownTunable(String),
    #[error("tunable '{name}' expects a {expected} value")]
    TunableKind { name: String, expected: &'static str },
    #[error("no pending load with id {0:?}")]
    UnknownLoad(LoadId),
    #[error("load {id:?} is a {actual} request, not a {expected} request")]
    LoadPurpose {
        id: LoadId,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("asset '{path}' failed to load: {reason}")]
    LoadFailed { path: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
