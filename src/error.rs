use thiserror::Error;

/// Errors produced by the toolkit.
///
/// All failures are synchronous and final: no operation retries on its own,
/// and no operation returns a partial result alongside an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed textual input, e.g. an odd-length or non-hex-digit hex
    /// string.
    #[error("format error: {0}")]
    Format(String),

    /// A parameter violated a precondition, e.g. an empty XOR key, a
    /// non-16-byte AES key, or input that is not a block multiple.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reserved for strict padding validation. The lenient
    /// [`unpad_pkcs7`](crate::padding::unpad_pkcs7) never produces it.
    #[error("padding error: {0}")]
    Padding(String),

    /// The oracle's output never grew within the probing budget, so no
    /// block boundary could be observed.
    #[error("oracle output never grew within a {budget}-byte probing budget")]
    UnboundedOracle { budget: usize },

    /// Probing finished without confirming a classification. Deliberately
    /// not an "ambiguous best guess": the caller decides whether to retry.
    #[error("detection inconclusive: {0}")]
    Inconclusive(String),

    /// The underlying AES primitive failed.
    #[error(transparent)]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

pub type Result<T> = std::result::Result<T, Error>;
