use crate::transport::TransportError;

/// Errors surfaced by fallible construction paths.
///
/// Everything past construction is absorbed with logging so that embedding
/// the tracer never destabilizes the host application; see the failure
/// policies on [`AgentWriter`](crate::writer::AgentWriter) and
/// [`SpanBuffer`](crate::span_buffer::SpanBuffer).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The agent URL override uses a scheme other than `http`, `https` or
    /// `unix`.
    #[error("unsupported agent URL scheme in {0:?}")]
    UnsupportedScheme(String),
    /// The transport handle rejected its initial configuration.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The background worker thread could not be spawned.
    #[error("failed to spawn agent writer thread: {0}")]
    Thread(#[from] std::io::Error),
    /// A trace batch could not be encoded.
    #[error("message pack error")]
    MessagePack,
}

impl From<rmp::encode::ValueWriteError> for Error {
    fn from(_: rmp::encode::ValueWriteError) -> Self {
        Self::MessagePack
    }
}
