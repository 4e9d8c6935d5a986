use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallStatus {
    #[default]
    Idle,
    /// Our request is out, waiting for the callee.
    Calling,
    /// Someone is calling us.
    Receiving,
    InCall,
}

impl CallStatus {
    /// Calling or Receiving: the states a ring timeout applies to.
    pub fn is_ringing(self) -> bool {
        matches!(self, Self::Calling | Self::Receiving)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Calling => "calling",
            Self::Receiving => "receiving",
            Self::InCall => "in-call",
        })
    }
}
