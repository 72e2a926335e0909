use bitfield::bitfield;
use num_traits::FromPrimitive;

bitfield! {
    /// bmRequestType of a setup packet
    #[derive(Copy, Clone, Eq, PartialEq)]
    pub struct RequestType(u8);
    impl Debug;
    pub device_to_host, set_device_to_host: 7;
    pub kind_bits, set_kind_bits: 6, 5;
    pub recipient_bits, set_recipient_bits: 4, 0;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

#[derive(num_derive::FromPrimitive, num_derive::ToPrimitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum RequestKind {
    Standard = 0,
    Class = 1,
    Vendor = 2,
    Reserved = 3,
}

#[derive(num_derive::FromPrimitive, num_derive::ToPrimitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Recipient {
    Device = 0,
    Interface = 1,
    Endpoint = 2,
    /// Also covers the reserved encodings 4..=31.
    Other = 3,
}

/// One decoded setup packet. Lives for a single control transaction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SetupRequest {
    pub request_type: RequestType,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupRequest {
    pub const LEN: usize = 8;

    pub fn new(
        direction: Direction,
        kind: RequestKind,
        recipient: Recipient,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
    ) -> Self {
        let mut request_type = RequestType(0);
        request_type.set_device_to_host(direction == Direction::DeviceToHost);
        request_type.set_kind_bits(kind as u8);
        request_type.set_recipient_bits(recipient as u8);
        SetupRequest { request_type, request, value, index, length }
    }

    /// Decodes the little-endian wire form.
    pub fn parse(raw: &[u8; Self::LEN]) -> Self {
        SetupRequest {
            request_type: RequestType(raw[0]),
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            index: u16::from_le_bytes([raw[4], raw[5]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut raw = [0u8; Self::LEN];
        raw[0] = self.request_type.0;
        raw[1] = self.request;
        raw[2..4].copy_from_slice(&self.value.to_le_bytes());
        raw[4..6].copy_from_slice(&self.index.to_le_bytes());
        raw[6..8].copy_from_slice(&self.length.to_le_bytes());
        raw
    }

    pub fn direction(&self) -> Direction {
        if self.request_type.device_to_host() { Direction::DeviceToHost } else { Direction::HostToDevice }
    }

    pub fn kind(&self) -> RequestKind {
        RequestKind::from_u8(self.request_type.kind_bits()).unwrap_or(RequestKind::Reserved)
    }

    pub fn recipient(&self) -> Recipient {
        Recipient::from_u8(self.request_type.recipient_bits()).unwrap_or(Recipient::Other)
    }

    /// High byte of wValue on GET_DESCRIPTOR.
    pub fn descriptor_type(&self) -> u8 { (self.value >> 8) as u8 }

    /// Low byte of wValue on GET_DESCRIPTOR.
    pub fn descriptor_index(&self) -> u8 { (self.value & 0xff) as u8 }
}
