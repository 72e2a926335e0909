// Identity. The VID/PID pair is the shared V-USB CDC-ACM allocation.
pub const VENDOR_ID: u16 = 0x16c0;
pub const PRODUCT_ID: u16 = 0x05e1;
pub const DEVICE_VERSION: u16 = 0x0100;
pub const MANUFACTURER: &str = "digistump.com";
pub const PRODUCT: &str = "WebUSB Serial";
pub const LANGID_EN_US: u16 = 0x0409;

pub const STRING_INDEX_MANUFACTURER: u8 = 1;
pub const STRING_INDEX_PRODUCT: u8 = 2;
pub const STRING_INDEX_SERIAL: u8 = 3;

/// Number of UTF-16 code units in the serial number string.
pub const SERIAL_LEN: usize = 16;

// Buffer and packet sizing
pub const TX_BUF_SIZE: usize = 32;
pub const RX_BUF_SIZE: usize = 32;
pub const BULK_OUT_SIZE: usize = 8;
pub const BULK_IN_SIZE: usize = 8;
/// Largest frame the data-IN endpoint accepts per transaction.
pub const INTR_IN_PACKET_SIZE: usize = 8;
/// Largest frame the notification endpoint accepts per transaction.
pub const NOTIFY_PACKET_SIZE: usize = 8;
pub const EP0_MAX_PACKET_SIZE: u8 = 8;
/// Holds the largest dynamically assembled descriptor.
pub const SCRATCH_LEN: usize = 64;

// Endpoints
pub const CDC_NOTIF_EP_IN: u8 = 0x83;
pub const CDC_DATA_EP_OUT: u8 = 0x01;
pub const CDC_DATA_EP_IN: u8 = 0x81;
pub const NOTIFY_POLL_INTERVAL_MS: u8 = 100;
pub const MAX_BUS_POWER_MA: u8 = 100;

// Vendor request codes advertised in the BOS platform capabilities
pub const WEBUSB_VENDOR_CODE: u8 = 0xff;
pub const WINUSB_VENDOR_CODE: u8 = 0xfe;
/// wIndex of the MS OS 2.0 descriptor-set request.
pub const MS_OS_20_DESCRIPTOR_INDEX: u16 = 0x07;

// Standard requests and descriptor types
pub const USB_REQ_GET_DESCRIPTOR: u8 = 0x06;

pub const USB_DT_DEVICE: u8 = 0x01;
pub const USB_DT_CONFIG: u8 = 0x02;
pub const USB_DT_STRING: u8 = 0x03;
pub const USB_DT_INTERFACE: u8 = 0x04;
pub const USB_DT_ENDPOINT: u8 = 0x05;
pub const USB_DT_BOS: u8 = 0x0f;
pub const USB_DT_DEVICE_CAPABILITY: u8 = 0x10;
pub const USB_DT_CS_INTERFACE: u8 = 0x24;

pub const USB_CAP_TYPE_PLATFORM: u8 = 0x05;

// CDC class codes
pub const CDC_COMM_CLASS: u8 = 0x02;
pub const CDC_COMM_SUBCLASS_ACM: u8 = 0x02;
pub const CDC_COMM_PROTOCOL_AT: u8 = 0x01;
pub const CDC_DATA_CLASS: u8 = 0x0a;

// CDC functional descriptor subtypes
pub const CDC_FD_HEADER: u8 = 0x00;
pub const CDC_FD_CALL_MANAGEMENT: u8 = 0x01;
pub const CDC_FD_ACM: u8 = 0x02;
pub const CDC_FD_UNION: u8 = 0x06;

/// CDC class-specific requests (PSTN subclass, table 13).
#[derive(num_derive::FromPrimitive, num_derive::ToPrimitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum CdcRequest {
    SendEncapsulatedCommand = 0x00,
    GetEncapsulatedResponse = 0x01,
    SetCommFeature = 0x02,
    GetCommFeature = 0x03,
    ClearCommFeature = 0x04,
    SetLineCoding = 0x20,
    GetLineCoding = 0x21,
    /// The host "opens" the port; DTR/RTS live in wValue bits 0 and 1.
    SetControlLineState = 0x22,
    SendBreak = 0x23,
}

/// WebUSB vendor requests, carried in wIndex.
#[derive(num_derive::FromPrimitive, num_derive::ToPrimitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum WebUsbRequest {
    GetAllowedOrigins = 0x01,
    GetUrl = 0x02,
}

/// Selects the layout of the MS OS 2.0 descriptor set.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MsOsVariant {
    /// Set header followed directly by the WINUSB compatible ID. Applies to the whole device.
    Simple,
    /// Adds configuration and function subset headers so the compatible ID only binds the function
    /// starting at `DeviceConfig::first_interface`.
    Extended,
}

/// Per-device settings handed to the device at construction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceConfig {
    /// URL index the browser offers when the device is plugged in. 0 disables the landing page.
    pub landing_page: u8,
    /// First interface of the function that receives the WinUSB binding.
    pub first_interface: u8,
    pub ms_os: MsOsVariant,
    /// Milliseconds to keep servicing the bus after each accepted byte. Low-speed hosts that poll
    /// the data endpoint slowly need about 5.
    pub write_pacing_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig { landing_page: 1, first_interface: 0, ms_os: MsOsVariant::Simple, write_pacing_ms: 0 }
    }
}

/// CDC line coding as carried by SET_LINE_CODING / GET_LINE_CODING.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LineCoding {
    pub data_rate: u32,
    /// 0 = 1 stop bit, 1 = 1.5, 2 = 2
    pub stop_bits: u8,
    /// 0 = none, 1 = odd, 2 = even, 3 = mark, 4 = space
    pub parity: u8,
    pub data_bits: u8,
}

pub const LINE_CODING_LEN: usize = 7;

impl LineCoding {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != LINE_CODING_LEN {
            return None;
        }
        Some(LineCoding {
            data_rate: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            stop_bits: bytes[4],
            parity: bytes[5],
            data_bits: bytes[6],
        })
    }

    pub fn to_bytes(&self) -> [u8; LINE_CODING_LEN] {
        let mut out = [0u8; LINE_CODING_LEN];
        out[..4].copy_from_slice(&self.data_rate.to_le_bytes());
        out[4] = self.stop_bits;
        out[5] = self.parity;
        out[6] = self.data_bits;
        out
    }
}

impl Default for LineCoding {
    // 115200 8N1
    fn default() -> Self { LineCoding { data_rate: 115_200, stop_bits: 0, parity: 0, data_bits: 8 } }
}

/// Failures when laying out a configuration-store image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// The serial number is not exactly `SERIAL_LEN` ASCII characters.
    BadSerial,
    /// A URL does not fit in a single descriptor.
    UrlTooLong,
    /// The descriptors overflow the image.
    NoSpace,
    /// The allowed-origins list names too many URLs or an index that does not exist.
    TooManyOrigins,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::BadSerial => write!(f, "serial number must be {} ASCII characters", SERIAL_LEN),
            Error::UrlTooLong => write!(f, "URL does not fit in a descriptor"),
            Error::NoSpace => write!(f, "descriptors do not fit in the store image"),
            Error::TooManyOrigins => write!(f, "invalid allowed-origins list"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_coding_wire_format() {
        let lc = LineCoding::default();
        assert_eq!(lc.to_bytes(), [0x00, 0xc2, 0x01, 0x00, 0, 0, 8]);
        assert_eq!(LineCoding::from_bytes(&lc.to_bytes()), Some(lc));
        assert_eq!(LineCoding::from_bytes(&[0u8; 6]), None);
    }
}
