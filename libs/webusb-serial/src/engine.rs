//! Boundaries to the low-level USB protocol engine and the platform timer.

use crate::dispatch::SetupReply;
use crate::setup::SetupRequest;

/// Callbacks the engine makes into the device while it is being polled.
pub trait UsbHandler {
    /// A setup packet arrived on EP0. Standard requests other than GET_DESCRIPTOR are expected to be
    /// handled by the engine itself.
    fn setup(&mut self, request: &SetupRequest) -> SetupReply<'_>;
    /// Next chunk of a `DeferredIn` reply. Returns 0 once the transfer is complete.
    fn control_in(&mut self, buf: &mut [u8]) -> usize;
    /// Data stage of a `DeferredOut` request.
    fn control_out(&mut self, data: &[u8]);
    /// A packet arrived on the bulk OUT endpoint. May be called from interrupt context.
    fn data_out(&mut self, data: &[u8]);
    /// False while the inbound buffer is too full to take another OUT packet.
    fn accepts_out(&self) -> bool;
}

/// The transaction-level USB engine: bus signaling, endpoint buffers, reset handling.
pub trait UsbEngine {
    /// Services pending bus events, calling into `handler` synchronously.
    fn poll(&mut self, handler: &mut dyn UsbHandler);

    fn data_in_ready(&self) -> bool;
    /// Queues one frame on the bulk IN endpoint. An empty frame is a ZLP.
    fn send_data_in(&mut self, frame: &[u8]);

    fn notify_in_ready(&self) -> bool;
    fn send_notify_in(&mut self, frame: &[u8]);

    /// NAKs the bulk OUT endpoint while disabled.
    fn set_out_enabled(&mut self, enabled: bool);

    fn connect(&mut self);
    fn disconnect(&mut self);
}

/// Millisecond time source.
pub trait Clock {
    /// Free-running counter; wraps.
    fn millis(&self) -> u32;
    fn delay_ms(&mut self, ms: u32);
}
