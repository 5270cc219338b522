use crate::messages::RequestKind;

/// Client-side mirror of the Bolt connection state machine.
///
/// `Connected`, `Negotiated` and `Authenticating` only exist while a
/// connection is being established; an established connection moves
/// between `Ready`, the streaming states and the failure states.
/// `Defunct` is terminal: the socket is unusable and the pool must drop
/// the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connected,
    Negotiated,
    Authenticating,
    Ready,
    Streaming,
    TxReady,
    TxStreaming,
    Failed,
    Interrupted,
    Defunct,
}

impl State {
    pub fn in_transaction(self) -> bool {
        matches!(self, State::TxReady | State::TxStreaming)
    }

    pub fn is_streaming(self) -> bool {
        matches!(self, State::Streaming | State::TxStreaming)
    }

    pub fn is_open(self) -> bool {
        self != State::Defunct
    }

    /// Which requests the server would act on in this state. Everything
    /// else would come back IGNORED (or deadlock an undrained stream), so
    /// the connection refuses to send it in the first place.
    pub(crate) fn accepts(self, kind: RequestKind) -> bool {
        match self {
            State::Defunct => false,
            State::Failed | State::Interrupted => matches!(
                kind,
                RequestKind::Reset | RequestKind::AckFailure | RequestKind::Goodbye
            ),
            // an open result stream must be drained before the next request
            State::Streaming | State::TxStreaming => matches!(
                kind,
                RequestKind::Pull
                    | RequestKind::PullAll
                    | RequestKind::Discard
                    | RequestKind::DiscardAll
                    | RequestKind::Reset
                    | RequestKind::AckFailure
                    | RequestKind::Goodbye
            ),
            _ => true,
        }
    }

    /// The state a successful RUN moves to.
    pub(crate) fn after_run(self) -> State {
        if self.in_transaction() {
            State::TxStreaming
        } else {
            State::Streaming
        }
    }

    /// The state a drained result stream falls back to.
    pub(crate) fn after_drain(self) -> State {
        if self.in_transaction() {
            State::TxReady
        } else {
            State::Ready
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_states_drain_back_to_their_ready_state() {
        assert_eq!(State::Streaming.after_drain(), State::Ready);
        assert_eq!(State::TxStreaming.after_drain(), State::TxReady);
        assert_eq!(State::Ready.after_run(), State::Streaming);
        assert_eq!(State::TxReady.after_run(), State::TxStreaming);
    }

    #[test]
    fn failed_state_only_accepts_acknowledgements() {
        assert!(State::Failed.accepts(RequestKind::Reset));
        assert!(State::Failed.accepts(RequestKind::AckFailure));
        assert!(State::Failed.accepts(RequestKind::Goodbye));
        assert!(!State::Failed.accepts(RequestKind::Run));
        assert!(!State::Failed.accepts(RequestKind::Pull));
        assert!(!State::Failed.accepts(RequestKind::Begin));
    }

    #[test]
    fn streaming_states_only_accept_drain_requests() {
        assert!(State::Streaming.accepts(RequestKind::Pull));
        assert!(State::Streaming.accepts(RequestKind::Discard));
        assert!(State::Streaming.accepts(RequestKind::Reset));
        assert!(!State::Streaming.accepts(RequestKind::Run));
        assert!(!State::TxStreaming.accepts(RequestKind::Begin));
        assert!(!State::TxStreaming.accepts(RequestKind::Commit));
    }

    #[test]
    fn defunct_accepts_nothing() {
        assert!(!State::Defunct.accepts(RequestKind::Reset));
        assert!(!State::Defunct.accepts(RequestKind::Goodbye));
    }
}
