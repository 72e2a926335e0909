use crate::api::*;
use crate::dispatch::{ControlRequestDispatcher, SetupReply};
use crate::engine::{Clock, UsbEngine, UsbHandler};
use crate::notify::{NotificationSequencer, NotificationState};
use crate::ring::RingChannel;
use crate::setup::SetupRequest;
use crate::store::ConfigStore;

/// Bus-settle time between disconnect and reconnect in `begin`.
const RECONNECT_SETTLE_MS: u32 = 250;
/// Time given to enumeration at the end of `begin`.
const ENUMERATION_WAIT_MS: u32 = 500;

/// Byte-stream capability of the serial port.
pub trait SerialStream {
    /// Queues one byte. Returns 0 when the outbound buffer is full; the caller retries.
    fn write_byte(&mut self, byte: u8) -> usize;
    fn read_byte(&mut self) -> Option<u8>;
    fn peek(&mut self) -> Option<u8>;
    /// Bytes waiting to be read.
    fn available(&mut self) -> usize;
    /// Discards everything received but not yet read.
    fn flush(&mut self);

    /// Stops at the first byte the buffer refuses. Returns the count accepted.
    fn write(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        for &b in bytes {
            if self.write_byte(b) == 0 {
                break;
            }
            written += 1;
        }
        written
    }

    /// Retries each byte until it is accepted. There is no timeout: this only returns once the host
    /// has drained enough of the buffer.
    fn write_all(&mut self, bytes: &[u8]) {
        for &b in bytes {
            while self.write_byte(b) == 0 {}
        }
    }
}

/// Everything the engine's callbacks touch during a poll.
pub struct DeviceCore<S> {
    dispatcher: ControlRequestDispatcher<S>,
    sequencer: NotificationSequencer,
    rx: RingChannel<RX_BUF_SIZE>,
    tx: RingChannel<TX_BUF_SIZE>,
    send_empty_frame: bool,
    out_enabled: bool,
    dropped: usize,
}

impl<S: ConfigStore> DeviceCore<S> {
    fn new(config: DeviceConfig, store: S) -> Self {
        DeviceCore {
            dispatcher: ControlRequestDispatcher::new(config, store),
            sequencer: NotificationSequencer::new(),
            rx: RingChannel::new(),
            tx: RingChannel::new(),
            send_empty_frame: false,
            out_enabled: true,
            dropped: 0,
        }
    }

    fn reception_enabled(&self) -> bool { self.rx.len() < BULK_OUT_SIZE }

    /// Everything after `engine.poll` in one tick.
    fn service<E: UsbEngine + ?Sized>(&mut self, engine: &mut E) {
        if engine.data_in_ready() {
            if self.send_empty_frame {
                engine.send_data_in(&[]);
                self.send_empty_frame = false;
            } else if !self.tx.is_empty() {
                let mut frame = [0u8; INTR_IN_PACKET_SIZE];
                let len = self.tx.drain_into(&mut frame);
                engine.send_data_in(&frame[..len]);
                self.send_empty_frame = true;
            }
        }

        let enable = self.reception_enabled();
        if enable != self.out_enabled {
            log::trace!("OUT reception {}", if enable { "resumed" } else { "paused" });
            engine.set_out_enabled(enable);
            self.out_enabled = enable;
        }

        self.sequencer.service(engine);
    }
}

impl<S: ConfigStore> UsbHandler for DeviceCore<S> {
    fn setup(&mut self, request: &SetupRequest) -> SetupReply<'_> {
        self.dispatcher.dispatch(request, &mut self.sequencer, &mut self.send_empty_frame)
    }

    fn control_in(&mut self, buf: &mut [u8]) -> usize { self.dispatcher.read(buf) }

    fn control_out(&mut self, data: &[u8]) { self.dispatcher.write(data) }

    fn data_out(&mut self, data: &[u8]) {
        let mut lost = 0;
        for &b in data {
            if !self.rx.push(b) {
                lost += 1;
            }
        }
        if lost != 0 {
            self.dropped += lost;
            log::debug!("inbound buffer full, dropped {} bytes", lost);
        }
    }

    fn accepts_out(&self) -> bool { self.reception_enabled() }
}

/// A CDC-ACM serial port that browsers can also reach over WebUSB.
///
/// Nothing happens on the bus unless the device is polled: every blocking call here (`write_byte` on
/// a full buffer, `delay`, `read_byte`, `available`) runs the poll tick, and idle application loops
/// should call `task`.
pub struct WebUsbSerial<E, C, S> {
    engine: E,
    clock: C,
    core: DeviceCore<S>,
    write_pacing_ms: u32,
}

impl<E: UsbEngine, C: Clock, S: ConfigStore> WebUsbSerial<E, C, S> {
    pub fn new(engine: E, clock: C, store: S, config: DeviceConfig) -> Self {
        WebUsbSerial { engine, clock, write_pacing_ms: config.write_pacing_ms, core: DeviceCore::new(config, store) }
    }

    /// Forces re-enumeration and starts with empty buffers.
    pub fn begin(&mut self) {
        self.engine.disconnect();
        self.clock.delay_ms(RECONNECT_SETTLE_MS);
        self.engine.connect();
        let core = &mut self.core;
        critical_section::with(|_| {
            core.rx.clear();
            core.tx.clear();
            core.sequencer.reset();
            core.send_empty_frame = false;
        });
        self.engine.set_out_enabled(true);
        self.core.out_enabled = true;
        log::debug!("connected, waiting for enumeration");
        self.delay(ENUMERATION_WAIT_MS);
    }

    pub fn end(&mut self) {
        self.engine.disconnect();
        let core = &mut self.core;
        critical_section::with(|_| core.rx.clear());
    }

    /// One poll tick.
    pub fn poll(&mut self) {
        self.engine.poll(&mut self.core);
        self.core.service(&mut self.engine);
    }

    /// Waits a millisecond, then polls.
    pub fn refresh(&mut self) {
        self.clock.delay_ms(1);
        self.poll();
    }

    /// Keeps the bus serviced from an otherwise idle loop.
    pub fn task(&mut self) { self.refresh() }

    pub fn delay(&mut self, ms: u32) {
        let start = self.clock.millis();
        while self.clock.millis().wrapping_sub(start) < ms {
            self.refresh();
        }
    }

    pub fn is_ready(&mut self) -> bool {
        self.refresh();
        true
    }

    /// Whether the inbound buffer can take another OUT packet.
    pub fn reception_enabled(&self) -> bool { self.core.reception_enabled() }

    pub fn notification_state(&self) -> NotificationState { self.core.sequencer.state() }

    pub fn line_coding(&self) -> LineCoding { self.core.dispatcher.line_coding() }

    /// DTR in bit 0, RTS in bit 1, as last set by the host.
    pub fn control_lines(&self) -> u16 { self.core.dispatcher.control_lines() }

    /// Bytes written but not yet handed to the engine.
    pub fn pending_out(&self) -> usize { self.core.tx.len() }

    /// Inbound bytes lost to a full buffer since construction.
    pub fn dropped(&self) -> usize { self.core.dropped }

    pub fn store(&self) -> &S { self.core.dispatcher.store() }

    pub fn engine(&self) -> &E { &self.engine }

    pub fn engine_mut(&mut self) -> &mut E { &mut self.engine }

    pub fn clock(&self) -> &C { &self.clock }
}

impl<E: UsbEngine, C: Clock, S: ConfigStore> SerialStream for WebUsbSerial<E, C, S> {
    fn write_byte(&mut self, byte: u8) -> usize {
        if !self.core.tx.push(byte) {
            self.refresh();
            return 0;
        }
        if self.write_pacing_ms != 0 {
            self.delay(self.write_pacing_ms);
        }
        1
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.core.rx.pop();
        self.refresh();
        byte
    }

    fn peek(&mut self) -> Option<u8> { self.core.rx.peek() }

    fn available(&mut self) -> usize {
        self.refresh();
        self.core.rx.len()
    }

    fn flush(&mut self) {
        let core = &mut self.core;
        critical_section::with(|_| core.rx.clear());
    }
}

impl<E: UsbEngine, C: Clock, S: ConfigStore> core::fmt::Write for WebUsbSerial<E, C, S> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_all(s.as_bytes());
        Ok(())
    }
}
