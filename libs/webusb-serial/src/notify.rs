use crate::api::NOTIFY_PACKET_SIZE;
use crate::engine::UsbEngine;

/// CDC SERIAL_STATE notification: interface 0, two data bytes, DCD | DSR set.
pub const SERIAL_STATE_NOTIFICATION: [u8; 10] = [
    0xa1, // device-to-host, class, interface
    0x20, // SERIAL_STATE
    0x00, 0x00, // wValue
    0x00, 0x00, // wIndex
    0x02, 0x00, // wLength
    0x03, 0x00, // bRxCarrier | bTxCarrier
];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NotificationState {
    Idle,
    /// Waiting to send the first packet of the notification.
    PendingFull,
    /// First packet is out; the remainder still has to go.
    PendingShort,
}

/// Announces carrier-detect after the host opens the port. The notification is longer than the
/// interrupt endpoint's packet, so it always goes out as exactly two frames.
#[derive(Debug)]
pub struct NotificationSequencer {
    state: NotificationState,
}

impl NotificationSequencer {
    pub const fn new() -> Self { NotificationSequencer { state: NotificationState::Idle } }

    pub fn state(&self) -> NotificationState { self.state }

    pub fn is_idle(&self) -> bool { self.state == NotificationState::Idle }

    /// Starts a notification. Has no effect unless idle; returns whether it armed.
    pub fn arm(&mut self) -> bool {
        if self.state != NotificationState::Idle {
            log::trace!("notification already in flight ({:?})", self.state);
            return false;
        }
        self.state = NotificationState::PendingFull;
        true
    }

    pub fn reset(&mut self) { self.state = NotificationState::Idle; }

    /// The frame to send next, if any.
    pub fn next_frame(&self) -> Option<&'static [u8]> {
        match self.state {
            NotificationState::Idle => None,
            NotificationState::PendingFull => Some(&SERIAL_STATE_NOTIFICATION[..NOTIFY_PACKET_SIZE]),
            NotificationState::PendingShort => Some(&SERIAL_STATE_NOTIFICATION[NOTIFY_PACKET_SIZE..]),
        }
    }

    /// Sends the next frame if the notification endpoint can take it, and only then moves on.
    pub fn service<E: UsbEngine + ?Sized>(&mut self, engine: &mut E) {
        let frame = match self.next_frame() {
            Some(frame) => frame,
            None => return,
        };
        if !engine.notify_in_ready() {
            return;
        }
        engine.send_notify_in(frame);
        self.state = match self.state {
            NotificationState::PendingFull => NotificationState::PendingShort,
            _ => NotificationState::Idle,
        };
    }
}

impl Default for NotificationSequencer {
    fn default() -> Self { Self::new() }
}
