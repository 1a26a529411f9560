//! The message flow coordinator, [`PtpInstance`]

use rand::Rng;

use crate::{
    clock::Clock,
    network::NetworkPort,
    observability::ObservablePortState,
    port::Port,
    time::Time,
    Event,
};

/// Object that acts as the central point of this library
///
/// It owns a fixed array of [`Port`]s and addresses them by index, so a
/// boundary clock is an instance with several ports and an ordinary clock is
/// the single port case. The instance doesn't run on its own: the host calls
/// [`handle_receive`](PtpInstance::handle_receive) for every received buffer
/// and [`tick`](PtpInstance::tick) at its processing cadence, and performs
/// the sends and timestamp fetches the ports request through their injected
/// hardware.
///
/// Ports never hold references to the instance or to each other; cross-port
/// views (for example for a boundary clock's management layer) are taken by
/// reading each port's [`observe`](Port::observe) snapshot.
#[derive(Debug)]
pub struct PtpInstance<C, P, R, const N: usize> {
    ports: [Port<C, P, R>; N],
}

impl<C: Clock, P: NetworkPort, R: Rng> PtpInstance<C, P, R, 1> {
    /// Create an instance with a single port, an ordinary clock
    pub fn new_ordinary_clock(port: Port<C, P, R>) -> Self {
        Self::new_boundary_clock([port])
    }
}

impl<C: Clock, P: NetworkPort, R: Rng, const N: usize> PtpInstance<C, P, R, N> {
    /// Create an instance owning the given ports
    ///
    /// Port numbers must match their index plus one, so that the index a
    /// host uses to address a port is recoverable from its identity.
    pub fn new_boundary_clock(mut ports: [Port<C, P, R>; N]) -> Self {
        for (index, port) in ports.iter_mut().enumerate() {
            assert_eq!(port.identity().port_number as usize, index + 1);
            // numberPorts describes the instance, not the port
            port.set_number_ports(N as u16);
        }
        Self { ports }
    }

    /// Process one received message on the port with the given index
    pub fn handle_receive(&mut self, port_index: usize, data: &[u8], rx_timestamp: Time) {
        self.ports[port_index].handle_receive(data, rx_timestamp);
    }

    /// Drive the time based behavior of every port
    pub fn tick(&mut self, now: Time) {
        for port in &mut self.ports {
            port.tick(now);
        }
    }

    /// Access a port
    pub fn port(&self, port_index: usize) -> &Port<C, P, R> {
        &self.ports[port_index]
    }

    /// Access a port mutably
    pub fn port_mut(&mut self, port_index: usize) -> &mut Port<C, P, R> {
        &mut self.ports[port_index]
    }

    /// Take the oldest queued notification of any port
    pub fn take_event(&mut self) -> Option<Event> {
        self.ports.iter_mut().find_map(|port| port.take_event())
    }

    /// Snapshots of all ports
    pub fn observe(&self) -> [ObservablePortState; N] {
        core::array::from_fn(|index| self.ports[index].observe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        port::tests::{setup_port, setup_port_number},
        port::PortState,
        time::Time,
    };

    #[test]
    fn ordinary_clock_drives_its_port() {
        let mut instance = PtpInstance::new_ordinary_clock(setup_port());

        instance.tick(Time::from_secs(1));
        assert_eq!(instance.port(0).state(), PortState::Listening);

        assert!(matches!(
            instance.take_event(),
            Some(Event::StateChanged { .. })
        ));
        assert!(instance.take_event().is_none());

        let [snapshot] = instance.observe();
        assert_eq!(snapshot.port_ds.port_state, PortState::Listening);
        assert_eq!(snapshot.current_ds.steps_removed, 0);
        assert_eq!(snapshot.default_ds.number_ports, 1);
    }

    #[test]
    fn boundary_clock_reports_its_port_count() {
        let instance = PtpInstance::new_boundary_clock([setup_port(), setup_port_number(2)]);

        let snapshots = instance.observe();
        for snapshot in snapshots {
            assert_eq!(snapshot.default_ds.number_ports, 2);
        }
    }

    #[test]
    #[should_panic]
    fn port_numbers_must_match_indices() {
        // both ports carry port number 1, the second belongs at index 0
        let _ = PtpInstance::new_boundary_clock([setup_port(), setup_port()]);
    }
}
