//! Abstraction of a network [`Port`] of a device
//!
//! A port owns everything that belongs to one PTP communication path: its
//! data sets, the foreign master list, the pairing state of the in-flight
//! measurements, the servo and its timers. The host drives it from exactly
//! one thread of execution through two entry points: [`Port::handle_receive`]
//! for every received buffer and [`Port::tick`] as the scheduling heartbeat.
//! All timer bookkeeping happens against the `now` passed into `tick`, so no
//! operation ever blocks or waits internally.

use arrayvec::ArrayVec;
use rand::Rng;

pub use measurement::Measurement;
pub use state::{PortEvent, PortState, StateMachineError};

use crate::{
    bmc::{
        bmca::{Bmca, RecommendedState},
        foreign_master::{ForeignMaster, RegisterOutcome},
    },
    clock::Clock,
    config::{DelayMechanism, InstanceConfig, PortConfig, ServoConfig},
    datastructures::{
        common::PortIdentity,
        datasets::{InternalCurrentDS, InternalDefaultDS, InternalParentDS, PortDS, TimePropertiesDS},
        messages::{Header, Message, MessageBody, MessageType, MAX_DATA_LEN},
        WireFormatError,
    },
    network::NetworkPort,
    observability::{FaultInjection, ObservablePortState, PortStatistics},
    servo::{PiServo, ServoAction},
    time::{Duration, Time},
    Event,
};

mod e2e;
mod measurement;
mod p2p;
mod sequence_id;
pub(crate) mod state;

use e2e::E2eExchange;
use p2p::P2pExchange;
use sequence_id::SequenceIdGenerator;

const MAX_EVENTS: usize = 8;

/// Why an ingress message was not processed
///
/// These are the typed outcomes internal operations report upwards; the
/// port folds every one of them into its statistics so that no drop is
/// silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[allow(missing_docs)]
pub enum IngressError {
    #[cfg_attr(feature = "std", error("message length out of range for its type"))]
    InvalidLength,
    #[cfg_attr(feature = "std", error("unsupported protocol version"))]
    InvalidVersion,
    #[cfg_attr(feature = "std", error("message for a different domain"))]
    InvalidDomain,
    #[cfg_attr(feature = "std", error("malformed message"))]
    ParseFailed,
    #[cfg_attr(feature = "std", error("hardware produced no timestamp"))]
    TimestampUnavailable,
    #[cfg_attr(feature = "std", error("timestamps out of order"))]
    OrderingViolation,
    #[cfg_attr(feature = "std", error("sequence or identity mismatch"))]
    SequenceMismatch,
    #[cfg_attr(feature = "std", error("event illegal in the current state"))]
    StateMachineError,
    #[cfg_attr(feature = "std", error("foreign master list full"))]
    OverflowDropped,
}

impl From<WireFormatError> for IngressError {
    fn from(error: WireFormatError) -> Self {
        match error {
            WireFormatError::BufferTooShort => IngressError::InvalidLength,
            WireFormatError::EnumConversionError
            | WireFormatError::CapacityError
            | WireFormatError::Invalid => IngressError::ParseFailed,
        }
    }
}

/// A single port of a PTP instance
///
/// # Generics
/// A [`Port`] is generic over:
/// * **`C`**: The [`Clock`] implementation steering the local clock
/// * **`P`**: The [`NetworkPort`] implementation transmitting for this port
/// * **`R`**: The random number generator used to space delay requests
#[derive(Debug)]
pub struct Port<C, P, R> {
    config: PortConfig,
    clock: C,
    network: P,
    rng: R,
    port_identity: PortIdentity,
    state: PortState,

    default_ds: InternalDefaultDS,
    current_ds: InternalCurrentDS,
    parent_ds: InternalParentDS,
    time_properties_ds: TimePropertiesDS,
    peer_mean_link_delay: Duration,

    bmca: Bmca,
    e2e: E2eExchange,
    p2p: P2pExchange,
    servo: PiServo,

    announce_seq_ids: SequenceIdGenerator,
    sync_seq_ids: SequenceIdGenerator,
    delay_seq_ids: SequenceIdGenerator,
    pdelay_seq_ids: SequenceIdGenerator,
    last_sync_sequence: Option<u16>,

    // Deadlines, all in the timescale the host feeds into `tick`
    announce_timeout_at: Option<Time>,
    sync_timeout_at: Option<Time>,
    holdover_expires_at: Option<Time>,
    qualification_at: Option<Time>,
    next_announce_tx: Option<Time>,
    next_sync_tx: Option<Time>,
    next_delay_req: Option<Time>,
    next_pdelay_req: Option<Time>,

    // Two step egress waiting for its hardware transmit timestamp
    pending_sync_follow_up: Option<(u16, Time)>,
    pending_pdelay_follow_up: Option<(Header, Time)>,

    calibration_progress: u8,
    /// A full announce receipt window elapsed without any candidate; the
    /// port may promote itself out of listening
    announce_window_expired: bool,

    statistics: PortStatistics,
    events: ArrayVec<Event, MAX_EVENTS>,
    fault_injection: FaultInjection,
    packet_buffer: [u8; MAX_DATA_LEN],
}

impl<C: Clock, P: NetworkPort, R: Rng> Port<C, P, R> {
    /// Create a new port
    ///
    /// The port starts out in [`PortState::Initializing`] and reaches
    /// [`PortState::Listening`] on its first tick.
    pub fn new(
        instance_config: InstanceConfig,
        config: PortConfig,
        servo_config: ServoConfig,
        port_number: u16,
        clock: C,
        network: P,
        rng: R,
    ) -> Self {
        debug_assert!(port_number >= 1);
        debug_assert!(config.announce_receipt_timeout >= 2);

        // a port on its own is an instance of one; an instance owning
        // several ports overwrites this through set_number_ports
        let mut default_ds = InternalDefaultDS::new(instance_config);
        default_ds.number_ports = 1;

        let port_identity = PortIdentity {
            clock_identity: default_ds.clock_identity,
            port_number,
        };

        Port {
            clock,
            network,
            rng,
            port_identity,
            state: PortState::Initializing,
            current_ds: InternalCurrentDS::default(),
            parent_ds: InternalParentDS::new(&default_ds),
            time_properties_ds: TimePropertiesDS::default(),
            peer_mean_link_delay: Duration::ZERO,
            bmca: Bmca::new(port_identity),
            e2e: E2eExchange::new(config.rounding_compensation),
            p2p: P2pExchange::new(config.rounding_compensation),
            servo: PiServo::new(servo_config),
            announce_seq_ids: SequenceIdGenerator::new(),
            sync_seq_ids: SequenceIdGenerator::new(),
            delay_seq_ids: SequenceIdGenerator::new(),
            pdelay_seq_ids: SequenceIdGenerator::new(),
            last_sync_sequence: None,
            announce_timeout_at: None,
            sync_timeout_at: None,
            holdover_expires_at: None,
            qualification_at: None,
            next_announce_tx: None,
            next_sync_tx: None,
            next_delay_req: None,
            next_pdelay_req: None,
            pending_sync_follow_up: None,
            pending_pdelay_follow_up: None,
            calibration_progress: 0,
            announce_window_expired: false,
            statistics: PortStatistics::default(),
            events: ArrayVec::new(),
            fault_injection: FaultInjection::default(),
            packet_buffer: [0u8; MAX_DATA_LEN],
            default_ds,
            config,
        }
    }

    /// The identity of this port
    pub fn identity(&self) -> PortIdentity {
        self.port_identity
    }

    /// Record how many ports the owning instance has
    ///
    /// `numberPorts` is instance wide data; the instance sets it on every
    /// port it takes ownership of.
    pub(crate) fn set_number_ports(&mut self, number_ports: u16) {
        self.default_ds.number_ports = number_ports;
    }

    /// The protocol state of this port
    pub fn state(&self) -> PortState {
        self.state
    }

    /// The event counters of this port
    pub fn statistics(&self) -> PortStatistics {
        self.statistics
    }

    /// Take the oldest queued notification, if any
    pub fn take_event(&mut self) -> Option<Event> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }

    /// A consistent snapshot of everything observable about this port
    pub fn observe(&self) -> ObservablePortState {
        ObservablePortState {
            default_ds: (&self.default_ds).into(),
            current_ds: (&self.current_ds).into(),
            parent_ds: (&self.parent_ds).into(),
            time_properties_ds: self.time_properties_ds,
            port_ds: self.port_ds(),
            servo_lock: self.servo.lock_state(),
            statistics: self.statistics,
        }
    }

    /// The PortDS view of this port
    pub fn port_ds(&self) -> PortDS {
        PortDS {
            port_identity: self.port_identity,
            port_state: self.state,
            log_announce_interval: self.config.announce_interval.as_log_2(),
            announce_receipt_timeout: self.config.announce_receipt_timeout,
            log_sync_interval: self.config.sync_interval.as_log_2(),
            delay_mechanism: self.config.delay_mechanism,
            mean_link_delay: self.peer_mean_link_delay.to_time_interval(),
            version_number: 2,
            minor_version_number: 1,
        }
    }

    /// The failure toggles, for exercising error paths in tests
    pub fn fault_injection_mut(&mut self) -> &mut FaultInjection {
        &mut self.fault_injection
    }

    /// Administratively take this port out of service
    pub fn disable(&mut self, now: Time) {
        self.apply_event(PortEvent::DesignatedDisabled, now);
    }

    /// Re-enable an administratively disabled port
    pub fn enable(&mut self, now: Time) {
        self.apply_event(PortEvent::DesignatedEnabled, now);
    }

    /// Clear a fault reported earlier; the port reinitializes
    pub fn clear_fault(&mut self, now: Time) {
        self.apply_event(PortEvent::FaultCleared, now);
    }
}

// Ingress processing
impl<C: Clock, P: NetworkPort, R: Rng> Port<C, P, R> {
    /// Process one received message
    ///
    /// `rx_timestamp` is the (preferably hardware) reception timestamp of
    /// the buffer. It is required for the event messages and used as the
    /// current time for all bookkeeping triggered by the message.
    pub fn handle_receive(&mut self, data: &[u8], rx_timestamp: Time) {
        match self.process_buffer(data, rx_timestamp) {
            Ok(()) => self.statistics.messages_received += 1,
            Err(error) => {
                log::warn!("Dropped ingress message: {:?}", error);
                self.record_ingress_error(error);
            }
        }
    }

    fn process_buffer(&mut self, data: &[u8], rx_timestamp: Time) -> Result<(), IngressError> {
        if data.len() < 34 || data.len() > MAX_DATA_LEN {
            return Err(IngressError::InvalidLength);
        }

        // version and domain are judged on the raw header so that a
        // malformed body of a foreign domain does not show up as a parse
        // failure of ours
        if data[1] & 0x0f != 2 {
            return Err(IngressError::InvalidVersion);
        }
        if data[4] != self.default_ds.domain_number {
            return Err(IngressError::InvalidDomain);
        }

        let message = Message::deserialize(data)?;

        if message.header.sdo_id != self.default_ds.sdo_id {
            return Err(IngressError::InvalidDomain);
        }

        // Our own transmissions reflected back are not input
        if message.header.source_port_identity == self.port_identity {
            return Ok(());
        }

        let header = message.header;
        match message.body {
            MessageBody::Announce(announce) => {
                self.handle_announce(&header, &announce, rx_timestamp)
            }
            MessageBody::Sync(sync) => self.handle_sync(&header, &sync, rx_timestamp),
            MessageBody::FollowUp(follow_up) => self.handle_follow_up(&header, &follow_up),
            MessageBody::DelayReq(_) => self.handle_delay_req(&header, rx_timestamp),
            MessageBody::DelayResp(resp) => self.handle_delay_resp(&header, &resp),
            MessageBody::PDelayReq(_) => self.handle_pdelay_req(&header, rx_timestamp),
            MessageBody::PDelayResp(resp) => self.handle_pdelay_resp(&header, &resp, rx_timestamp),
            MessageBody::PDelayRespFollowUp(follow_up) => {
                self.handle_pdelay_resp_follow_up(&header, &follow_up)
            }
            MessageBody::Signaling(_) | MessageBody::Management(_) => {
                // Framing is validated here; semantics live downstream
                log::trace!("Ignoring {:?} message", message.body.content_type());
                Ok(())
            }
        }
    }

    fn handle_announce(
        &mut self,
        header: &Header,
        announce: &crate::datastructures::messages::AnnounceMessage,
        rx_timestamp: Time,
    ) -> Result<(), IngressError> {
        if !self.state.runs_bmca() {
            return Ok(());
        }

        match self.bmca.register_announce_message(header, announce, rx_timestamp) {
            RegisterOutcome::New | RegisterOutcome::Refreshed => {
                self.statistics.bmca_candidate_updates += 1;
            }
            RegisterOutcome::UnexpectedSequence => {
                self.statistics.bmca_candidate_updates += 1;
                self.statistics.unexpected_sequences += 1;
            }
            RegisterOutcome::Ignored => return Ok(()),
            RegisterOutcome::Overflow => return Err(IngressError::OverflowDropped),
        }

        // Hearing any candidate arms the receipt timeout anew
        self.announce_timeout_at = Some(rx_timestamp + self.config.announce_duration());
        self.announce_window_expired = false;

        // An announce from the current parent refreshes the parent dataset,
        // IEEE1588-2019 section 9.5.3
        if self.state.is_slave()
            && header.source_port_identity == self.parent_ds.parent_port_identity
        {
            self.update_parent_from_announce(header, announce);
        }

        self.run_bmca(rx_timestamp);
        Ok(())
    }

    fn handle_sync(
        &mut self,
        header: &Header,
        sync: &crate::datastructures::messages::SyncMessage,
        rx_timestamp: Time,
    ) -> Result<(), IngressError> {
        if !self.state.is_slave() {
            return Ok(());
        }
        if header.source_port_identity != self.parent_ds.parent_port_identity {
            log::debug!("Sync from a port that is not our parent");
            return Ok(());
        }

        if let Some(previous) = self.last_sync_sequence {
            let in_order = header
                .sequence_id
                .wrapping_sub(previous)
                .wrapping_sub(1)
                < u16::MAX / 2;
            if !in_order {
                // accepted anyway; only the statistics take note
                self.statistics.unexpected_sequences += 1;
            }
        }
        self.last_sync_sequence = Some(header.sequence_id);

        self.sync_timeout_at = Some(rx_timestamp + self.config.sync_duration());
        self.holdover_expires_at = None;

        let update = self.e2e.handle_sync(header, sync, rx_timestamp);
        if let Some(update) = update {
            self.process_offset_update(update, rx_timestamp);
        }
        Ok(())
    }

    fn handle_follow_up(
        &mut self,
        header: &Header,
        follow_up: &crate::datastructures::messages::FollowUpMessage,
    ) -> Result<(), IngressError> {
        if !self.state.is_slave()
            || header.source_port_identity != self.parent_ds.parent_port_identity
        {
            return Ok(());
        }

        let update = self.e2e.handle_follow_up(header, follow_up)?;
        if let Some(update) = update {
            let event_time = update.measurement.event_time;
            self.process_offset_update(update, event_time);
        }
        Ok(())
    }

    fn handle_delay_req(
        &mut self,
        request_header: &Header,
        rx_timestamp: Time,
    ) -> Result<(), IngressError> {
        if !self.state.is_master() {
            return Ok(());
        }

        let response = Message::delay_resp(
            *request_header,
            self.port_identity,
            self.config.min_delay_req_interval(),
            rx_timestamp,
        );
        self.send_message(&response, false, rx_timestamp);
        Ok(())
    }

    fn handle_delay_resp(
        &mut self,
        header: &Header,
        resp: &crate::datastructures::messages::DelayRespMessage,
    ) -> Result<(), IngressError> {
        if !self.state.is_slave() {
            return Ok(());
        }

        let update = self.e2e.handle_delay_resp(header, resp, self.port_identity)?;
        if let Some(update) = update {
            let event_time = update.measurement.event_time;
            self.process_offset_update(update, event_time);
        }
        Ok(())
    }

    fn handle_pdelay_req(
        &mut self,
        request_header: &Header,
        rx_timestamp: Time,
    ) -> Result<(), IngressError> {
        // peer delay runs in every operational state, but a port that is
        // down must not answer on the link
        if !self.state.is_operational() {
            return Ok(());
        }
        if !matches!(self.config.delay_mechanism, DelayMechanism::P2P { .. }) {
            return Ok(());
        }

        // The response is two step: it carries the request receipt time and
        // the follow up carries our transmit time once the hardware reports
        // it
        let response = Message::pdelay_resp(*request_header, self.port_identity, rx_timestamp);
        self.send_message(&response, true, rx_timestamp);
        self.pending_pdelay_follow_up = Some((*request_header, rx_timestamp));
        Ok(())
    }

    fn handle_pdelay_resp(
        &mut self,
        header: &Header,
        resp: &crate::datastructures::messages::PDelayRespMessage,
        rx_timestamp: Time,
    ) -> Result<(), IngressError> {
        if !self.state.is_operational() {
            return Ok(());
        }

        let update = self
            .p2p
            .handle_pdelay_resp(header, resp, self.port_identity, rx_timestamp)?;
        if let Some(update) = update {
            self.process_peer_delay_update(update);
        }
        Ok(())
    }

    fn handle_pdelay_resp_follow_up(
        &mut self,
        header: &Header,
        follow_up: &crate::datastructures::messages::PDelayRespFollowUpMessage,
    ) -> Result<(), IngressError> {
        if !self.state.is_operational() {
            return Ok(());
        }

        let update = self
            .p2p
            .handle_pdelay_resp_follow_up(header, follow_up, self.port_identity)?;
        if let Some(update) = update {
            self.process_peer_delay_update(update);
        }
        Ok(())
    }

    fn record_ingress_error(&mut self, error: IngressError) {
        match error {
            IngressError::InvalidLength
            | IngressError::InvalidVersion
            | IngressError::InvalidDomain
            | IngressError::ParseFailed => self.statistics.validations_failed += 1,
            IngressError::SequenceMismatch => self.statistics.sequence_mismatches += 1,
            IngressError::TimestampUnavailable => self.statistics.timestamps_unavailable += 1,
            IngressError::OrderingViolation => {
                self.statistics.ordering_violations += 1;
                self.statistics.validations_failed += 1;
            }
            IngressError::StateMachineError => self.statistics.state_machine_errors += 1,
            IngressError::OverflowDropped => {
                self.statistics.foreign_overflows += 1;
                self.statistics.validations_failed += 1;
            }
        }
    }
}

// Measurement and servo handling
impl<C: Clock, P: NetworkPort, R: Rng> Port<C, P, R> {
    fn process_offset_update(&mut self, update: e2e::OffsetUpdate, now: Time) {
        if update.ordering_violation {
            log::warn!("Timestamps out of order in offset computation");
            self.record_ingress_error(IngressError::OrderingViolation);
        }
        if update.clamped {
            self.statistics.validations_failed += 1;
        }

        let measurement = update.measurement;
        self.current_ds.offset_from_master = measurement.offset_from_master;
        self.current_ds.mean_path_delay = measurement.mean_path_delay;

        let locked_before = self.servo.is_locked();

        match self
            .servo
            .sample(measurement.offset_from_master, measurement.event_time)
        {
            ServoAction::AdjustFrequency { ppb } => {
                if let Err(error) = self.clock.adjust_frequency(ppb) {
                    log::error!("Could not adjust clock frequency: {:?}", error);
                    self.fault("clock frequency adjustment failed", now);
                    return;
                }
            }
            ServoAction::StepClock { offset } => {
                self.statistics.clock_steps += 1;
                self.calibration_progress = 0;
                if let Err(error) = self.clock.step_clock(offset) {
                    log::error!("Could not step clock: {:?}", error);
                    self.fault("clock step failed", now);
                    return;
                }
            }
        }

        if self.servo.is_locked() != locked_before {
            self.notify_sync_status();
        }

        // A stretch of in-threshold measurements completes calibration
        if self.state == PortState::Uncalibrated {
            if self.servo.is_locked() {
                self.calibration_progress = self.calibration_progress.saturating_add(1);
                if self.calibration_progress >= self.config.calibration_threshold {
                    self.apply_event(PortEvent::CalibrationDone, now);
                }
            } else {
                self.calibration_progress = 0;
            }
        }
    }

    fn process_peer_delay_update(&mut self, update: p2p::PeerDelayUpdate) {
        if update.ordering_violation {
            log::warn!("Timestamps out of order in peer delay computation");
            self.record_ingress_error(IngressError::OrderingViolation);
        }
        self.peer_mean_link_delay = update.mean_link_delay;
    }

    fn notify_sync_status(&mut self) {
        self.push_event(Event::SyncStatus {
            port_id: self.port_identity,
            locked: self.servo.is_locked(),
            offset: self.current_ds.offset_from_master,
            mean_path_delay: self.current_ds.mean_path_delay,
        });
    }
}

// Best master clock algorithm glue
impl<C: Clock, P: NetworkPort, R: Rng> Port<C, P, R> {
    fn run_bmca(&mut self, now: Time) {
        if !self.state.runs_bmca() {
            return;
        }

        // While listening and before the first receipt window has expired,
        // an empty candidate set is not a decision yet
        if self.state == PortState::Listening
            && !self.bmca.has_candidates()
            && !self.announce_window_expired
        {
            return;
        }

        self.statistics.bmca_selections += 1;

        let recommendation =
            self.bmca
                .run(&self.default_ds, now, self.config.announce_duration());

        match recommendation {
            RecommendedState::GrandMaster | RecommendedState::Master => {
                self.statistics.bmca_local_wins += 1;
                self.reset_parent_to_self();

                if self.default_ds.slave_only {
                    // never qualify as a master; fall back to listening
                    if self.state != PortState::Listening {
                        self.apply_event(PortEvent::AnnounceReceiptTimeout, now);
                    }
                } else {
                    let event = match recommendation {
                        RecommendedState::GrandMaster => PortEvent::RecommendedGrandMaster,
                        _ => PortEvent::RecommendedMaster,
                    };
                    self.apply_event(event, now);
                }
            }
            RecommendedState::Slave(foreign) => {
                self.statistics.bmca_foreign_wins += 1;
                let parent_changed = self.adopt_parent(&foreign);
                // a slave that keeps following the same master needs no
                // transition; a new master means recalibrating first
                if self.state != PortState::Slave || parent_changed {
                    self.apply_event(PortEvent::RecommendedSlave, now);
                }
            }
            RecommendedState::Passive(_) => {
                self.statistics.bmca_passive_wins += 1;
                self.apply_event(PortEvent::RecommendedPassive, now);
            }
        }
    }

    /// Take over the foreign master as our parent, decision code S1
    ///
    /// Returns whether this is a different master than before.
    fn adopt_parent(&mut self, foreign: &ForeignMaster) -> bool {
        let previous_parent = self.parent_ds.parent_port_identity;

        self.update_parent_from_announce(&foreign.header, &foreign.announce);

        let parent_changed = previous_parent != foreign.sender_identity;
        if parent_changed {
            // measurements against the old master describe a different path
            self.e2e.reset();
            self.last_sync_sequence = None;
            self.calibration_progress = 0;
        }
        parent_changed
    }

    fn update_parent_from_announce(
        &mut self,
        header: &Header,
        announce: &crate::datastructures::messages::AnnounceMessage,
    ) {
        self.current_ds.steps_removed = announce.steps_removed + 1;

        self.parent_ds.parent_port_identity = header.source_port_identity;
        self.parent_ds.grandmaster_identity = announce.grandmaster_identity;
        self.parent_ds.grandmaster_clock_quality = announce.grandmaster_clock_quality;
        self.parent_ds.grandmaster_priority_1 = announce.grandmaster_priority_1;
        self.parent_ds.grandmaster_priority_2 = announce.grandmaster_priority_2;

        self.time_properties_ds = announce.time_properties(header);
        if let Err(error) = self.clock.set_properties(&self.time_properties_ds) {
            log::error!("Could not update clock properties: {:?}", error);
        }
    }

    /// Reset the parent dataset to the local clock, decision codes M1/M2
    ///
    /// While not synchronized to an external master, the instance reports
    /// itself as its own grandmaster with zero steps removed.
    fn reset_parent_to_self(&mut self) {
        self.current_ds.steps_removed = 0;
        self.current_ds.offset_from_master = Duration::ZERO;
        self.current_ds.mean_path_delay = Duration::ZERO;
        self.parent_ds = InternalParentDS::new(&self.default_ds);

        self.time_properties_ds = TimePropertiesDS::default();
    }
}

// The scheduling heartbeat
impl<C: Clock, P: NetworkPort, R: Rng> Port<C, P, R> {
    /// Drive all time based behavior of the port
    ///
    /// The host calls this at least once per processing interval and at most
    /// at the rate of the fastest configured message interval. Within one
    /// tick the order is fixed: transmit timestamps, timer expiries, the
    /// best master clock algorithm, then periodic egress.
    pub fn tick(&mut self, now: Time) {
        if self.state == PortState::Initializing {
            self.apply_event(PortEvent::InitializeDone, now);
        }

        self.poll_tx_timestamps(now);
        self.expire_pending_pairs(now);
        self.check_receipt_timeouts(now);

        if self.state.runs_bmca() {
            self.run_bmca(now);
        }

        self.periodic_egress(now);
    }

    fn poll_tx_timestamps(&mut self, now: Time) {
        if self.fault_injection.swallow_tx_timestamps {
            return;
        }

        if let Some((sequence_id, _)) = self.pending_sync_follow_up {
            match self
                .network
                .fetch_tx_timestamp(MessageType::Sync, sequence_id)
            {
                Ok(Some(timestamp)) => {
                    self.pending_sync_follow_up = None;
                    let follow_up = Message::follow_up(
                        &self.default_ds,
                        self.port_identity,
                        sequence_id,
                        timestamp,
                    );
                    self.send_message(&follow_up, false, now);
                }
                Ok(None) => {}
                Err(error) => {
                    log::error!("Could not fetch sync transmit timestamp: {:?}", error);
                    self.pending_sync_follow_up = None;
                    self.fault("transmit timestamp fetch failed", now);
                    return;
                }
            }
        }

        if let Some(sequence_id) = self.e2e.pending_tx_timestamp() {
            match self
                .network
                .fetch_tx_timestamp(MessageType::DelayReq, sequence_id)
            {
                Ok(Some(timestamp)) => {
                    if let Some(update) = self.e2e.handle_delay_tx_timestamp(sequence_id, timestamp)
                    {
                        self.process_offset_update(update, now);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    log::error!("Could not fetch delay req transmit timestamp: {:?}", error);
                    self.fault("transmit timestamp fetch failed", now);
                    return;
                }
            }
        }

        if let Some(sequence_id) = self.p2p.pending_tx_timestamp() {
            match self
                .network
                .fetch_tx_timestamp(MessageType::PDelayReq, sequence_id)
            {
                Ok(Some(timestamp)) => {
                    if let Some(update) = self.p2p.handle_req_tx_timestamp(sequence_id, timestamp) {
                        self.process_peer_delay_update(update);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    log::error!("Could not fetch pdelay req transmit timestamp: {:?}", error);
                    self.fault("transmit timestamp fetch failed", now);
                    return;
                }
            }
        }

        if let Some((request_header, _)) = self.pending_pdelay_follow_up {
            match self
                .network
                .fetch_tx_timestamp(MessageType::PDelayResp, request_header.sequence_id)
            {
                Ok(Some(timestamp)) => {
                    self.pending_pdelay_follow_up = None;
                    let follow_up =
                        Message::pdelay_resp_follow_up(request_header, self.port_identity, timestamp);
                    self.send_message(&follow_up, false, now);
                }
                Ok(None) => {}
                Err(error) => {
                    log::error!("Could not fetch pdelay resp transmit timestamp: {:?}", error);
                    self.pending_pdelay_follow_up = None;
                    self.fault("transmit timestamp fetch failed", now);
                }
            }
        }
    }

    fn expire_pending_pairs(&mut self, now: Time) {
        let window = self.config.sync_duration();

        let expired = self.e2e.expire(now, window);
        self.statistics.validations_failed += expired.late_follow_ups as u64;
        self.statistics.timestamps_unavailable += expired.lost_exchanges as u64;

        if self.p2p.expire(now, window) {
            self.statistics.timestamps_unavailable += 1;
        }

        if let Some((sequence_id, issued)) = self.pending_sync_follow_up {
            if now - issued > window {
                log::warn!("No transmit timestamp for sync {}", sequence_id);
                self.pending_sync_follow_up = None;
                self.statistics.timestamps_unavailable += 1;
            }
        }
        if let Some((header, issued)) = self.pending_pdelay_follow_up {
            if now - issued > window {
                log::warn!(
                    "No transmit timestamp for pdelay resp {}",
                    header.sequence_id
                );
                self.pending_pdelay_follow_up = None;
                self.statistics.timestamps_unavailable += 1;
            }
        }
    }

    fn check_receipt_timeouts(&mut self, now: Time) {
        if let Some(deadline) = self.announce_timeout_at {
            if now >= deadline
                && matches!(
                    self.state,
                    PortState::Listening
                        | PortState::Slave
                        | PortState::Uncalibrated
                        | PortState::Passive
                )
            {
                log::info!("Announce receipt timeout");
                self.announce_timeout_at = None;
                self.apply_event(PortEvent::AnnounceReceiptTimeout, now);
                // the subsequent algorithm run may promote the port
                self.announce_window_expired = true;
            }
        }

        if let Some(deadline) = self.sync_timeout_at {
            if now >= deadline && self.state.is_slave() {
                self.sync_timeout_at = None;
                self.servo.enter_holdover();
                self.notify_sync_status();
                self.holdover_expires_at = Some(now + self.config.sync_duration());
            }
        }

        if let Some(deadline) = self.holdover_expires_at {
            if now >= deadline {
                self.holdover_expires_at = None;
                if self.state == PortState::Slave {
                    log::warn!("Synchronization lost beyond holdover");
                    self.apply_event(PortEvent::SynchronizationFault, now);
                }
            }
        }

        if let Some(deadline) = self.qualification_at {
            if now >= deadline && self.state == PortState::PreMaster {
                self.qualification_at = None;
                self.apply_event(PortEvent::QualificationTimeout, now);
            }
        }
    }

    fn periodic_egress(&mut self, now: Time) {
        if self.state.is_master() {
            if self.next_announce_tx.map_or(false, |at| now >= at) {
                self.send_announce(now);
            }
            if self.next_sync_tx.map_or(false, |at| now >= at) {
                self.send_sync(now);
            }
        }

        if self.state.is_slave()
            && matches!(self.config.delay_mechanism, DelayMechanism::E2E { .. })
            && self.next_delay_req.map_or(false, |at| now >= at)
        {
            self.send_delay_req(now);
        }

        if matches!(self.config.delay_mechanism, DelayMechanism::P2P { .. })
            && self.state.is_operational()
        {
            match self.next_pdelay_req {
                Some(at) if now >= at => self.send_pdelay_req(now),
                None => self.send_pdelay_req(now),
                _ => {}
            }
        }
    }
}

// Egress
impl<C: Clock, P: NetworkPort, R: Rng> Port<C, P, R> {
    fn send_message(&mut self, message: &Message, event: bool, now: Time) {
        let length = match message.serialize(&mut self.packet_buffer) {
            Ok(length) => length,
            Err(error) => {
                log::error!("Could not serialize message: {:?}", error);
                return;
            }
        };

        if self.fault_injection.fail_sends {
            self.fault("send failed", now);
            return;
        }

        match self.network.send(&self.packet_buffer[..length], event) {
            Ok(()) => self.statistics.messages_sent += 1,
            Err(error) => {
                log::error!("Could not send message: {:?}", error);
                self.fault("send failed", now);
            }
        }
    }

    fn send_announce(&mut self, now: Time) {
        let sequence_id = self.announce_seq_ids.generate();
        let message = Message::announce(
            &self.default_ds,
            &self.parent_ds,
            &self.current_ds,
            &self.time_properties_ds,
            self.port_identity,
            sequence_id,
        );
        self.send_message(&message, false, now);
        self.next_announce_tx = Some(now + self.config.announce_interval.as_duration());
    }

    fn send_sync(&mut self, now: Time) {
        let sequence_id = self.sync_seq_ids.generate();
        let message = Message::sync(&self.default_ds, self.port_identity, sequence_id);
        self.send_message(&message, true, now);
        self.pending_sync_follow_up = Some((sequence_id, now));
        self.next_sync_tx = Some(now + self.config.sync_interval.as_duration());
    }

    fn send_delay_req(&mut self, now: Time) {
        let sequence_id = self.delay_seq_ids.generate();
        let message = Message::delay_req(&self.default_ds, self.port_identity, sequence_id);
        self.send_message(&message, true, now);
        self.e2e.delay_req_sent(sequence_id, now);
        self.next_delay_req = Some(now + self.jittered_delay_req_interval());
    }

    fn send_pdelay_req(&mut self, now: Time) {
        let sequence_id = self.pdelay_seq_ids.generate();
        let message = Message::pdelay_req(&self.default_ds, self.port_identity, sequence_id);
        self.send_message(&message, true, now);
        self.p2p.pdelay_req_sent(sequence_id, now);
        self.next_pdelay_req = Some(now + self.jittered_delay_req_interval());
    }

    /// Delay requests are spaced randomly between zero and twice the
    /// configured interval so that slaves do not synchronize their requests
    fn jittered_delay_req_interval(&mut self) -> Duration {
        let factor = self.rng.sample::<f64, _>(rand::distributions::Open01) * 2.0;
        let nanos = self.config.min_delay_req_interval().as_duration().nanos_lossy() * factor;
        Duration::from_fixed_nanos(fixed::types::I96F32::from_num(nanos))
    }
}

// State machine application and notifications
impl<C: Clock, P: NetworkPort, R: Rng> Port<C, P, R> {
    fn apply_event(&mut self, event: PortEvent, now: Time) {
        match state::transition(self.state, event) {
            Ok(None) => {}
            Ok(Some(new_state)) => self.enter_state(new_state, now),
            Err(error) => {
                log::debug!("{:?}", error);
                self.statistics.state_machine_errors += 1;
            }
        }
    }

    fn enter_state(&mut self, new_state: PortState, now: Time) {
        let old_state = self.state;
        log::info!(
            "New state for port {}: {} -> {}",
            self.port_identity.port_number,
            old_state,
            new_state
        );
        self.state = new_state;

        // Periodic egress stops unless the new state asks for it again
        self.next_announce_tx = None;
        self.next_sync_tx = None;
        self.next_delay_req = None;
        self.qualification_at = None;

        match new_state {
            PortState::Initializing | PortState::Faulty | PortState::Disabled => {
                self.announce_timeout_at = None;
                self.sync_timeout_at = None;
                self.holdover_expires_at = None;
                self.pending_sync_follow_up = None;
                self.pending_pdelay_follow_up = None;
                self.e2e.reset();
                self.p2p.reset();
                self.servo.reset();
            }
            PortState::Listening | PortState::Passive => {
                self.announce_timeout_at = Some(now + self.config.announce_duration());
                self.sync_timeout_at = None;
                self.holdover_expires_at = None;
            }
            PortState::PreMaster => {
                // becoming a master invalidates all slave side servo history
                self.servo.reset();
                self.announce_timeout_at = None;
                self.sync_timeout_at = None;
                self.holdover_expires_at = None;
                self.qualification_at = Some(now + self.qualification_duration());
            }
            PortState::Master => {
                // immediately start sending announces and syncs
                self.next_announce_tx = Some(now);
                self.next_sync_tx = Some(now);
            }
            PortState::Uncalibrated => {
                self.calibration_progress = 0;
                // an already armed receipt deadline keeps its original expiry
                self.announce_timeout_at
                    .get_or_insert(now + self.config.announce_duration());
                self.sync_timeout_at = Some(now + self.config.sync_duration());
                if matches!(self.config.delay_mechanism, DelayMechanism::E2E { .. }) {
                    self.next_delay_req = Some(now);
                }
            }
            PortState::Slave => {
                if matches!(self.config.delay_mechanism, DelayMechanism::E2E { .. }) {
                    self.next_delay_req = Some(now);
                }
            }
        }

        self.push_event(Event::StateChanged {
            port_id: self.port_identity,
            old: old_state,
            new: new_state,
        });
    }

    /// The time a port stays in pre master before taking over as master,
    /// IEEE1588-2019 section 9.2.6.11
    fn qualification_duration(&self) -> Duration {
        self.config.announce_interval.as_duration() * (self.current_ds.steps_removed as i64 + 1)
    }

    fn fault(&mut self, description: &'static str, now: Time) {
        self.push_event(Event::Fault {
            port_id: self.port_identity,
            description,
        });
        self.apply_event(PortEvent::FaultDetected, now);
    }

    fn push_event(&mut self, event: Event) {
        if self.events.is_full() {
            self.events.remove(0);
            self.statistics.events_dropped += 1;
        }
        self.events.push(event);
    }
}
