use std::fmt;

/// Negotiation state of one peer link.
///
/// `New → HaveLocalOffer → Stable` on the offering side,
/// `New → HaveRemoteOffer → Stable` on the answering side; any state may go
/// to `Closed`. Renegotiation re-enters `HaveLocalOffer`/`HaveRemoteOffer`
/// from `Stable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingState {
    New,
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Stable => "stable",
            Self::HaveLocalOffer => "have-local-offer",
            Self::HaveRemoteOffer => "have-remote-offer",
            Self::Closed => "closed",
        })
    }
}
