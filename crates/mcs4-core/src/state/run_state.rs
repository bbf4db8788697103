use crate::FaultCode;

/// Host-observable execution state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Ready,
    /// A terminate request stopped the run loop; cleared by resume or reset.
    Terminated,
    /// Fault is latched and no further progress is possible without reset.
    FaultLatched(FaultCode),
}

impl RunState {
    /// Returns the currently latched fault, if this state is fault-latched.
    #[must_use]
    pub const fn latched_fault(self) -> Option<FaultCode> {
        match self {
            Self::FaultLatched(cause) => Some(cause),
            Self::Ready | Self::Terminated => None,
        }
    }
}
