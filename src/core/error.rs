use thiserror::Error;

/// Errors raised while talking to a reader or card.
///
/// Every variant is non-fatal to the session: the selector and scanner
/// catch these at the narrowest scope (per candidate, per record) and
/// move on, and the session controller logs and skips the insertion.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The PC/SC layer rejected the operation
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// Reader name contained an interior NUL and cannot be passed to PC/SC
    #[error("Invalid reader name: {0}")]
    InvalidReaderName(String),

    /// The card returned fewer bytes than a status word
    #[error("Response shorter than a status word ({0} bytes)")]
    ShortResponse(usize),
}
