//! A simulated engine and clock, so the device runs on a development host.

use std::collections::VecDeque;

use crate::api::EP0_MAX_PACKET_SIZE;
use crate::dispatch::SetupReply;
use crate::engine::{Clock, UsbEngine, UsbHandler};
use crate::setup::SetupRequest;

/// How a control transfer ended, as the host saw it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ControlOutcome {
    /// Data stage bytes, and the size of each packet they came in.
    In { data: Vec<u8>, packets: Vec<usize> },
    /// The host's OUT data stage was accepted, or there was none.
    Ack,
    Stall,
}

enum HostEvent {
    Control(SetupRequest, Vec<u8>),
    DataOut(Vec<u8>),
}

/// Plays the host side of the bus. Transfers queued with `queue_*` are carried out on the next
/// `poll`; everything the device sends is recorded.
pub struct HostedEngine {
    connected: bool,
    out_enabled: bool,
    data_ready: bool,
    notify_ready: bool,
    data_frames: Vec<Vec<u8>>,
    notify_frames: Vec<Vec<u8>>,
    events: VecDeque<HostEvent>,
    outcomes: VecDeque<ControlOutcome>,
    polls: usize,
    disconnects: usize,
}

impl HostedEngine {
    pub fn new() -> Self {
        HostedEngine {
            connected: false,
            out_enabled: true,
            data_ready: true,
            notify_ready: true,
            data_frames: Vec::new(),
            notify_frames: Vec::new(),
            events: VecDeque::new(),
            outcomes: VecDeque::new(),
            polls: 0,
            disconnects: 0,
        }
    }

    /// Queues a control transfer. For host-to-device requests `data` is the OUT data stage.
    pub fn queue_control(&mut self, request: SetupRequest, data: &[u8]) {
        self.events.push_back(HostEvent::Control(request, data.to_vec()));
    }

    /// Queues one bulk OUT packet.
    pub fn queue_data_out(&mut self, data: &[u8]) { self.events.push_back(HostEvent::DataOut(data.to_vec())); }

    pub fn take_outcome(&mut self) -> Option<ControlOutcome> { self.outcomes.pop_front() }

    pub fn set_data_ready(&mut self, ready: bool) { self.data_ready = ready; }

    pub fn set_notify_ready(&mut self, ready: bool) { self.notify_ready = ready; }

    pub fn data_frames(&self) -> &[Vec<u8>] { &self.data_frames }

    pub fn notify_frames(&self) -> &[Vec<u8>] { &self.notify_frames }

    pub fn out_enabled(&self) -> bool { self.out_enabled }

    pub fn connected(&self) -> bool { self.connected }

    pub fn polls(&self) -> usize { self.polls }

    pub fn disconnects(&self) -> usize { self.disconnects }

    fn control(handler: &mut dyn UsbHandler, request: &SetupRequest, data: &[u8]) -> ControlOutcome {
        let chunk = EP0_MAX_PACKET_SIZE as usize;
        match handler.setup(request) {
            SetupReply::Data(bytes) => {
                let data = bytes.to_vec();
                let packets = data.chunks(chunk).map(|c| c.len()).collect();
                ControlOutcome::In { data, packets }
            }
            SetupReply::DeferredIn => {
                let mut data = Vec::new();
                let mut packets = Vec::new();
                let mut buf = [0u8; EP0_MAX_PACKET_SIZE as usize];
                while data.len() < request.length as usize {
                    let n = handler.control_in(&mut buf);
                    data.extend_from_slice(&buf[..n]);
                    packets.push(n);
                    if n < chunk {
                        break;
                    }
                }
                ControlOutcome::In { data, packets }
            }
            SetupReply::DeferredOut => {
                handler.control_out(data);
                ControlOutcome::Ack
            }
            SetupReply::Ack => ControlOutcome::Ack,
            SetupReply::Stall => ControlOutcome::Stall,
        }
    }
}

impl Default for HostedEngine {
    fn default() -> Self { Self::new() }
}

impl UsbEngine for HostedEngine {
    fn poll(&mut self, handler: &mut dyn UsbHandler) {
        self.polls += 1;
        let mut held = VecDeque::new();
        while let Some(event) = self.events.pop_front() {
            match event {
                HostEvent::Control(request, data) => {
                    let outcome = Self::control(handler, &request, &data);
                    log::trace!("control {:x?} -> {:?}", request.to_bytes(), outcome);
                    self.outcomes.push_back(outcome);
                }
                HostEvent::DataOut(data) => {
                    // NAKed packets stay queued, in order
                    if held.is_empty() && self.out_enabled && handler.accepts_out() {
                        handler.data_out(&data);
                    } else {
                        held.push_back(HostEvent::DataOut(data));
                    }
                }
            }
        }
        self.events = held;
    }

    fn data_in_ready(&self) -> bool { self.data_ready }

    fn send_data_in(&mut self, frame: &[u8]) { self.data_frames.push(frame.to_vec()); }

    fn notify_in_ready(&self) -> bool { self.notify_ready }

    fn send_notify_in(&mut self, frame: &[u8]) { self.notify_frames.push(frame.to_vec()); }

    fn set_out_enabled(&mut self, enabled: bool) { self.out_enabled = enabled; }

    fn connect(&mut self) { self.connected = true; }

    fn disconnect(&mut self) {
        self.connected = false;
        self.disconnects += 1;
    }
}

/// Simulated milliseconds. Time only moves when somebody waits.
#[derive(Debug, Default)]
pub struct HostedClock {
    now: u32,
}

impl HostedClock {
    pub fn new() -> Self { HostedClock { now: 0 } }

    pub fn starting_at(now: u32) -> Self { HostedClock { now } }
}

impl Clock for HostedClock {
    fn millis(&self) -> u32 { self.now }

    fn delay_ms(&mut self, ms: u32) { self.now = self.now.wrapping_add(ms); }
}
