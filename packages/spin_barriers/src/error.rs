use thiserror::Error;

/// Errors that can occur when building a barrier topology.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested participant count has no tree layout.
    ///
    /// Layouts are hand-embedded into the physical core map and exist only
    /// for 1 to 8 participants. This is a configuration error; callers are
    /// expected to treat it as fatal.
    #[error(
        "unsupported participant count {participants}: tree layouts are defined for 1 to 8 participants"
    )]
    UnsupportedParticipantCount {
        /// The count that was requested.
        participants: usize,
    },
}

/// A specialized `Result` type for barrier construction, returning the
/// crate's [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
