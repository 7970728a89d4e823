use std::io;

use crate::Destination;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the local socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] io::Error),

    /// Sending a datagram failed for a reason other than back-pressure.
    #[error("send to {to} failed: {source}")]
    SendFailed {
        to: Destination,
        #[source]
        source: io::Error,
    },

    /// Receiving a datagram failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// The payload does not fit in a single datagram.
    #[error("datagram of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },
}
