/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The request didn't finish in time.
    Timeout,
    /// The provider doesn't support the requested operation.
    Unsupported,
    /// Any other errors.
    Other,
}
