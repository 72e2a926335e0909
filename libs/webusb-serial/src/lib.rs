#![cfg_attr(target_os = "none", no_std)]

//! Device side of a composite USB serial port: CDC-ACM for terminal programs, plus the WebUSB and
//! Microsoft OS 2.0 descriptors that let browsers and Windows bind to it without a driver install.
//!
//! The crate does not touch hardware. A [`UsbEngine`] handles transactions on the wire and calls
//! back into the device while it is polled; the device decides what every setup packet gets, moves
//! bytes between its ring buffers and the endpoints, and announces the port to the host when opened.

pub mod api;
pub use api::*;
pub mod cursor;
pub mod descriptors;
pub mod device;
pub mod dispatch;
pub mod engine;
#[cfg(not(target_os = "none"))]
pub mod hosted;
pub mod notify;
pub mod ring;
pub mod setup;
pub mod store;

pub use device::{SerialStream, WebUsbSerial};
pub use dispatch::SetupReply;
pub use engine::{Clock, UsbEngine, UsbHandler};
pub use setup::SetupRequest;
pub use store::{ConfigStore, EepromStore, UrlScheme};
