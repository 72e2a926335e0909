use crate::api::*;
use crate::cursor::{BlobSource, DescriptorBlob};

const fn lo(v: u16) -> u8 { (v & 0xff) as u8 }
const fn hi(v: u16) -> u8 { (v >> 8) as u8 }

pub static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,            // bLength
    USB_DT_DEVICE, // bDescriptorType
    0x10,
    0x02, // bcdUSB 2.1, required for BOS
    CDC_COMM_CLASS,
    0, // bDeviceSubClass
    0, // bDeviceProtocol
    EP0_MAX_PACKET_SIZE,
    lo(VENDOR_ID),
    hi(VENDOR_ID),
    lo(PRODUCT_ID),
    hi(PRODUCT_ID),
    lo(DEVICE_VERSION),
    hi(DEVICE_VERSION),
    STRING_INDEX_MANUFACTURER,
    STRING_INDEX_PRODUCT,
    STRING_INDEX_SERIAL,
    1, // bNumConfigurations
];

pub const CONFIG_DESCRIPTOR_LEN: usize = 67;

// Layout:
//   Config
//   IF0 CDC Comm
//     CDC Header, ACM, Union, CallMgmt
//     EP interrupt IN (notifications)
//   IF1 CDC Data
//     EP bulk OUT, EP bulk IN
pub static CONFIG_DESCRIPTOR: [u8; CONFIG_DESCRIPTOR_LEN] = [
    9,
    USB_DT_CONFIG,
    CONFIG_DESCRIPTOR_LEN as u8,
    0,
    2,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bus powered, no remote wakeup
    MAX_BUS_POWER_MA / 2,
    // CDC communication interface
    9,
    USB_DT_INTERFACE,
    0, // bInterfaceNumber
    0, // bAlternateSetting
    1, // interrupt IN only
    CDC_COMM_CLASS,
    CDC_COMM_SUBCLASS_ACM,
    CDC_COMM_PROTOCOL_AT,
    0,
    // header functional descriptor, CDC 1.10
    5,
    USB_DT_CS_INTERFACE,
    CDC_FD_HEADER,
    0x10,
    0x01,
    // ACM functional descriptor: SET/GET_LINE_CODING, SET_CONTROL_LINE_STATE
    4,
    USB_DT_CS_INTERFACE,
    CDC_FD_ACM,
    0x02,
    // union functional descriptor
    5,
    USB_DT_CS_INTERFACE,
    CDC_FD_UNION,
    0, // master: comm interface
    1, // slave: data interface
    // call management: handled by the device, over the data interface
    5,
    USB_DT_CS_INTERFACE,
    CDC_FD_CALL_MANAGEMENT,
    0x03,
    1,
    // notification endpoint
    7,
    USB_DT_ENDPOINT,
    CDC_NOTIF_EP_IN,
    0x03, // interrupt
    NOTIFY_PACKET_SIZE as u8,
    0,
    NOTIFY_POLL_INTERVAL_MS,
    // CDC data interface
    9,
    USB_DT_INTERFACE,
    1,
    0,
    2, // bulk OUT + bulk IN
    CDC_DATA_CLASS,
    0,
    0,
    0,
    7,
    USB_DT_ENDPOINT,
    CDC_DATA_EP_OUT,
    0x02, // bulk
    BULK_OUT_SIZE as u8,
    0,
    0,
    7,
    USB_DT_ENDPOINT,
    CDC_DATA_EP_IN,
    0x02,
    BULK_IN_SIZE as u8,
    0,
    0,
];

pub const BOS_TOTAL_LEN: usize = 57;

const BOS_PREFIX_LEN: usize = 28;

pub static BOS_PREFIX: [u8; BOS_PREFIX_LEN] = [
    // BOS header
    5,
    USB_DT_BOS,
    BOS_TOTAL_LEN as u8,
    0,
    2, // bNumDeviceCaps
    // WebUSB platform capability
    24,
    USB_DT_DEVICE_CAPABILITY,
    USB_CAP_TYPE_PLATFORM,
    0,
    // {3408b638-09a9-47a0-8bfd-a0768815b665}
    0x38,
    0xb6,
    0x08,
    0x34,
    0xa9,
    0x09,
    0xa0,
    0x47,
    0x8b,
    0xfd,
    0xa0,
    0x76,
    0x88,
    0x15,
    0xb6,
    0x65,
    0x00,
    0x01, // bcdVersion 1.0
    WEBUSB_VENDOR_CODE,
    // iLandingPage goes here
];

pub static BOS_SUFFIX: [u8; 28] = [
    // Microsoft OS 2.0 platform capability
    28,
    USB_DT_DEVICE_CAPABILITY,
    USB_CAP_TYPE_PLATFORM,
    0,
    // {d8dd60df-4589-4cc7-9cd2-659d9e648a9f}
    0xdf,
    0x60,
    0xdd,
    0xd8,
    0x89,
    0x45,
    0xc7,
    0x4c,
    0x9c,
    0xd2,
    0x65,
    0x9d,
    0x9e,
    0x64,
    0x8a,
    0x9f,
    0x00,
    0x00,
    0x03,
    0x06, // dwWindowsVersion 0x06030000 (8.1)
    MS_OS_20_SET_LEN as u8,
    0, // wMSOSDescriptorSetTotalLength, patched for the extended set
    WINUSB_VENDOR_CODE,
    0, // no alternate enumeration
];

pub const BOS_LANDING_PAGE_OFFSET: usize = BOS_PREFIX_LEN;
/// wMSOSDescriptorSetTotalLength, 24 bytes into the MS OS 2.0 capability.
pub const BOS_MS_OS_SET_LEN_OFFSET: usize = BOS_PREFIX_LEN + 1 + 24;

/// Length of the simple MS OS 2.0 descriptor set. The BOS advertises this exact value; the host
/// rejects the set if they disagree.
pub const MS_OS_20_SET_LEN: usize = 0x1e;
pub const MS_OS_20_EXTENDED_SET_LEN: usize = 0x2e;

pub static MS_OS_20_DESCRIPTOR_SET: [u8; MS_OS_20_SET_LEN] = [
    // descriptor set header
    0x0a,
    0x00,
    0x00,
    0x00, // MS_OS_20_SET_HEADER_DESCRIPTOR
    0x00,
    0x00,
    0x03,
    0x06,
    MS_OS_20_SET_LEN as u8,
    0x00,
    // compatible ID
    0x14,
    0x00,
    0x03,
    0x00, // MS_OS_20_FEATURE_COMPATIBLE_ID
    b'W',
    b'I',
    b'N',
    b'U',
    b'S',
    b'B',
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
];

const MS_OS_20_EXTENDED_PREFIX_LEN: usize = 22;

pub static MS_OS_20_EXTENDED_PREFIX: [u8; MS_OS_20_EXTENDED_PREFIX_LEN] = [
    // descriptor set header
    0x0a,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x03,
    0x06,
    MS_OS_20_EXTENDED_SET_LEN as u8,
    0x00,
    // configuration subset header. bConfigurationValue is an index, so 0 for the first config
    0x08,
    0x00,
    0x01,
    0x00,
    0x00,
    0x00,
    0x24,
    0x00,
    // function subset header
    0x08,
    0x00,
    0x02,
    0x00,
    // bFirstInterface goes here
];

pub static MS_OS_20_EXTENDED_SUFFIX: [u8; 23] = [
    0x00, // reserved
    0x1c,
    0x00, // wSubsetLength
    // compatible ID
    0x14,
    0x00,
    0x03,
    0x00,
    b'W',
    b'I',
    b'N',
    b'U',
    b'S',
    b'B',
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
];

pub const MS_OS_20_FIRST_INTERFACE_OFFSET: usize = MS_OS_20_EXTENDED_PREFIX_LEN;

/// Builds descriptor content. Fixed tables are handed out as-is; BOS, the extended MS OS 2.0 set, and
/// string descriptors are assembled into one scratch buffer, which therefore only ever holds the most
/// recently built descriptor.
pub struct DescriptorCatalog {
    config: DeviceConfig,
    scratch: [u8; SCRATCH_LEN],
    scratch_len: usize,
}

impl DescriptorCatalog {
    pub const fn new(config: DeviceConfig) -> Self {
        DescriptorCatalog { config, scratch: [0u8; SCRATCH_LEN], scratch_len: 0 }
    }

    pub fn config(&self) -> &DeviceConfig { &self.config }

    /// Bytes of the most recently assembled descriptor.
    pub fn scratch(&self) -> &[u8] { &self.scratch[..self.scratch_len] }

    /// Resolves a blob to its bytes. `Store` sources are not the catalog's to resolve.
    pub fn resolve(&self, source: BlobSource) -> Option<&[u8]> {
        match source {
            BlobSource::Rom(table) => Some(table),
            BlobSource::Scratch => Some(self.scratch()),
            BlobSource::Store(_) => None,
        }
    }

    fn assemble(&mut self, parts: &[&[u8]]) -> usize {
        let mut idx = 0;
        for p in parts.iter() {
            self.scratch[idx..idx + p.len()].copy_from_slice(p);
            idx += p.len();
        }
        self.scratch_len = idx;
        idx
    }

    pub fn ms_os_20_len(&self) -> usize {
        match self.config.ms_os {
            MsOsVariant::Simple => MS_OS_20_SET_LEN,
            MsOsVariant::Extended => MS_OS_20_EXTENDED_SET_LEN,
        }
    }

    pub fn device(&self) -> DescriptorBlob {
        DescriptorBlob::new(BlobSource::Rom(&DEVICE_DESCRIPTOR), DEVICE_DESCRIPTOR.len())
    }

    pub fn configuration(&self) -> DescriptorBlob {
        DescriptorBlob::new(BlobSource::Rom(&CONFIG_DESCRIPTOR), CONFIG_DESCRIPTOR.len())
    }

    /// Prefix, landing-page byte, suffix; then the advertised MS OS set length is patched to match
    /// whichever set variant is being served.
    pub fn bos(&mut self) -> DescriptorBlob {
        let landing = [self.config.landing_page];
        let parts: [&[u8]; 3] = [&BOS_PREFIX, &landing, &BOS_SUFFIX];
        let len = self.assemble(&parts);
        let set_len = (self.ms_os_20_len() as u16).to_le_bytes();
        self.scratch[BOS_MS_OS_SET_LEN_OFFSET..BOS_MS_OS_SET_LEN_OFFSET + 2].copy_from_slice(&set_len);
        DescriptorBlob::new(BlobSource::Scratch, len)
    }

    pub fn ms_os_20(&mut self) -> DescriptorBlob {
        match self.config.ms_os {
            MsOsVariant::Simple => {
                DescriptorBlob::new(BlobSource::Rom(&MS_OS_20_DESCRIPTOR_SET), MS_OS_20_DESCRIPTOR_SET.len())
            }
            MsOsVariant::Extended => {
                let first_if = [self.config.first_interface];
                let parts: [&[u8]; 3] = [&MS_OS_20_EXTENDED_PREFIX, &first_if, &MS_OS_20_EXTENDED_SUFFIX];
                let len = self.assemble(&parts);
                DescriptorBlob::new(BlobSource::Scratch, len)
            }
        }
    }

    /// String descriptors. Index 3 wraps the store's serial number in a string header; its length is
    /// always `SERIAL_LEN` code units, padded with zeros if the store hands back fewer characters.
    pub fn string(&mut self, index: u8, serial: &[u8]) -> Option<DescriptorBlob> {
        let len = match index {
            0 => {
                let langid = LANGID_EN_US.to_le_bytes();
                let parts: [&[u8]; 2] = [&[4, USB_DT_STRING], &langid];
                self.assemble(&parts)
            }
            STRING_INDEX_MANUFACTURER => self.utf16_string(MANUFACTURER.as_bytes().iter().copied(), None),
            STRING_INDEX_PRODUCT => self.utf16_string(PRODUCT.as_bytes().iter().copied(), None),
            STRING_INDEX_SERIAL => self.utf16_string(serial.iter().copied(), Some(SERIAL_LEN)),
            _ => return None,
        };
        Some(DescriptorBlob::new(BlobSource::Scratch, len))
    }

    fn utf16_string(&mut self, chars: impl Iterator<Item = u8>, fixed_units: Option<usize>) -> usize {
        let max_units = (SCRATCH_LEN - 2) / 2;
        let mut units = 0;
        for (dst, src) in self.scratch[2..].chunks_exact_mut(2).zip(chars).take(fixed_units.unwrap_or(max_units)) {
            dst.copy_from_slice(&(src as u16).to_le_bytes());
            units += 1;
        }
        if let Some(fixed) = fixed_units {
            for dst in self.scratch[2 + units * 2..2 + fixed * 2].iter_mut() {
                *dst = 0;
            }
            units = fixed;
        }
        let slen = 2 + units * 2;
        self.scratch[0] = slen as u8;
        self.scratch[1] = USB_DT_STRING;
        self.scratch_len = slen;
        slen
    }

    /// Standard GET_DESCRIPTOR. `None` means the descriptor is not supported and the request must stall.
    pub fn descriptor(&mut self, descriptor_type: u8, index: u8, serial: &[u8]) -> Option<DescriptorBlob> {
        match descriptor_type {
            USB_DT_DEVICE => Some(self.device()),
            USB_DT_CONFIG => Some(self.configuration()),
            USB_DT_STRING => self.string(index, serial),
            USB_DT_BOS => Some(self.bos()),
            _ => None,
        }
    }
}
