//! The per-port protocol state machine
//!
//! The transition function is pure so it can be tested exhaustively; the
//! [`Port`](crate::port::Port) applies the results and performs the entry
//! actions (timer resets, servo resets, notifications) that go with them.

use core::fmt::{Display, Formatter};

/// Protocol state of a port, see *IEEE1588-2019 section 9.2.5*
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PortState {
    Initializing = 1,
    Faulty = 2,
    Disabled = 3,
    Listening = 4,
    PreMaster = 5,
    Master = 6,
    Passive = 7,
    Uncalibrated = 8,
    Slave = 9,
}

impl PortState {
    /// Whether the port takes part in the protocol at all in this state
    ///
    /// The bootstrap and administrative states neither transmit nor process
    /// any exchange.
    pub fn is_operational(&self) -> bool {
        !matches!(
            self,
            PortState::Initializing | PortState::Faulty | PortState::Disabled
        )
    }

    /// Whether the best master clock algorithm runs in this state
    ///
    /// Every operational state runs it.
    pub fn runs_bmca(&self) -> bool {
        self.is_operational()
    }

    /// Whether the port sends the periodic master messages in this state
    pub fn is_master(&self) -> bool {
        matches!(self, PortState::Master)
    }

    /// Whether the port tracks a remote master in this state
    pub fn is_slave(&self) -> bool {
        matches!(self, PortState::Uncalibrated | PortState::Slave)
    }
}

impl Display for PortState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            PortState::Initializing => write!(f, "Initializing"),
            PortState::Faulty => write!(f, "Faulty"),
            PortState::Disabled => write!(f, "Disabled"),
            PortState::Listening => write!(f, "Listening"),
            PortState::PreMaster => write!(f, "PreMaster"),
            PortState::Master => write!(f, "Master"),
            PortState::Passive => write!(f, "Passive"),
            PortState::Uncalibrated => write!(f, "Uncalibrated"),
            PortState::Slave => write!(f, "Slave"),
        }
    }
}

/// An input to the port state machine
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)] // the names are the protocol's own event names
pub enum PortEvent {
    Powerup,
    Initialize,
    InitializeDone,
    FaultDetected,
    FaultCleared,
    DesignatedEnabled,
    DesignatedDisabled,
    RecommendedMaster,
    RecommendedGrandMaster,
    RecommendedSlave,
    RecommendedPassive,
    AnnounceReceiptTimeout,
    SynchronizationFault,
    QualificationTimeout,
    /// Enough in-threshold offsets were measured to leave uncalibrated
    CalibrationDone,
}

/// The event was not legal in the state it arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[cfg_attr(feature = "std", error("event {event:?} is illegal in state {state}"))]
pub struct StateMachineError {
    #[allow(missing_docs)]
    pub state: PortState,
    #[allow(missing_docs)]
    pub event: PortEvent,
}

/// Compute the successor state for an event
///
/// `Ok(None)` means the event is valid but causes no transition. The caller
/// performs the entry actions belonging to the returned state.
pub(crate) fn transition(
    state: PortState,
    event: PortEvent,
) -> Result<Option<PortState>, StateMachineError> {
    use PortEvent::*;
    use PortState::*;

    let illegal = || Err(StateMachineError { state, event });
    let to = |next: PortState| Ok((next != state).then_some(next));

    match event {
        Powerup | Initialize => to(Initializing),
        InitializeDone => match state {
            Initializing => to(Listening),
            _ => illegal(),
        },
        FaultDetected => match state {
            Disabled => illegal(),
            _ => to(Faulty),
        },
        FaultCleared => match state {
            Faulty => to(Initializing),
            _ => illegal(),
        },
        DesignatedDisabled => to(Disabled),
        DesignatedEnabled => match state {
            Disabled => to(Initializing),
            _ => illegal(),
        },
        // The algorithm may move the port out of every state it runs in
        RecommendedMaster | RecommendedGrandMaster => match state {
            Listening | Uncalibrated | Slave | Passive => to(PreMaster),
            PreMaster | Master => Ok(None),
            Initializing | Faulty | Disabled => illegal(),
        },
        RecommendedSlave => match state {
            Listening | PreMaster | Master | Passive | Slave => to(Uncalibrated),
            Uncalibrated => Ok(None),
            Initializing | Faulty | Disabled => illegal(),
        },
        RecommendedPassive => match state {
            Listening | PreMaster | Master | Uncalibrated | Slave => to(Passive),
            Passive => Ok(None),
            Initializing | Faulty | Disabled => illegal(),
        },
        AnnounceReceiptTimeout => match state {
            Slave | Uncalibrated | Passive | Listening => to(Listening),
            _ => illegal(),
        },
        SynchronizationFault => match state {
            Slave => to(Uncalibrated),
            _ => illegal(),
        },
        QualificationTimeout => match state {
            PreMaster => to(Master),
            _ => illegal(),
        },
        CalibrationDone => match state {
            Uncalibrated => to(Slave),
            _ => illegal(),
        },
    }
}
