use thiserror::Error;

use crate::message::Fid;

pub type HubResult<T> = Result<T, HubError>;

/// Domain error shared across the hub crates.
///
/// Variants map onto the wire-visible error kinds: `bad_input`, `not_found`,
/// `unavailable.network_failure`, `unavailable.storage_failure` and
/// `unknown`. An unknown user during a merge is its own variant because the
/// sync engine dispatches on it to run dependency recovery.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HubError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown fid: {0}")]
    UnknownFid(Fid),

    #[error("network unavailable: {0}")]
    NetworkFailure(String),

    #[error("storage unavailable: {0}")]
    StorageFailure(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl HubError {
    /// Status code for a merge rejected because the user is unknown.
    pub const STATUS_UNKNOWN_FID: u16 = 412;

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::UnknownFid(_) => Self::STATUS_UNKNOWN_FID,
            Self::NetworkFailure(_) | Self::StorageFailure(_) => 503,
            Self::Unknown(_) => 500,
        }
    }

    pub fn is_unknown_fid(&self) -> bool {
        matches!(self, Self::UnknownFid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fid_maps_to_412() {
        let err = HubError::UnknownFid(Fid::from(42));
        assert_eq!(err.status_code(), HubError::STATUS_UNKNOWN_FID);
        assert!(err.is_unknown_fid());
    }

    #[test]
    fn kinds_carry_distinct_codes() {
        assert_eq!(HubError::BadInput("x".to_owned()).status_code(), 400);
        assert_eq!(HubError::NotFound("x".to_owned()).status_code(), 404);
        assert_eq!(HubError::NetworkFailure("x".to_owned()).status_code(), 503);
        assert_eq!(HubError::StorageFailure("x".to_owned()).status_code(), 503);
        assert_eq!(HubError::Unknown("x".to_owned()).status_code(), 500);
    }
}
