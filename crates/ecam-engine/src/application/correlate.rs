//! Classifies a received frame against the in-flight request.

use ecam_core::protocol::{MessageId, ProtocolStrategy, ID_INDEX};

/// How a complete frame relates to the request that is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The frame is our own request reflected back; ignore it.
    Echo,
    /// The main board is busy and asks us to try again.
    Busy,
    /// The frame answers some other request.
    Mismatch,
    /// The frame answers the in-flight request.
    Matched,
}

/// Classifies `frame` against `request`.
///
/// Checks run in order: echo, busy, correlation.  The correlation rules
/// themselves live on the strategy so they can differ per generation.
pub fn classify(strategy: &ProtocolStrategy, request: &[u8], frame: &[u8]) -> Outcome {
    if frame == request {
        return Outcome::Echo;
    }
    if frame.get(ID_INDEX) == Some(&MessageId::Busy.as_byte()) {
        return Outcome::Busy;
    }
    if strategy.answers_request(request, frame) {
        Outcome::Matched
    } else {
        Outcome::Mismatch
    }
}
