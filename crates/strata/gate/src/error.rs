use thiserror::Error;

/// Errors from the Feature Gate engine.
///
/// Hard integration failures only. A denied feature is not an error: the
/// verdict carries `allowed: false` and the caller branches on it.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}
