use crate::api::{Error, SERIAL_LEN};

/// Non-volatile configuration: serial number and WebUSB descriptors.
///
/// Index 0 of `lookup` is the allowed-origins descriptor set, indices 1.. are URL descriptors. Both are
/// returned as complete descriptors, ready to go on the wire.
pub trait ConfigStore {
    fn lookup(&self, index: u16) -> Option<&[u8]>;
    /// ASCII serial number, `SERIAL_LEN` characters.
    fn serial_number(&self) -> &[u8];
}

pub const EEPROM_SIZE: usize = 512;

pub const EEPROM_SIGNATURE: [u8; 4] = *b"WebL";
const SIG_START: usize = 0;
const VERSION_START: usize = 4;
const SERIAL_START: usize = 6;
const WEBUSB_START: usize = 128;

pub const STORE_VERSION: u16 = 0x0100;

// WebUSB descriptor types
const WEBUSB_DESCRIPTOR_SET_HEADER: u8 = 0;
const WEBUSB_CONFIGURATION_SUBSET_HEADER: u8 = 1;
const WEBUSB_FUNCTION_SUBSET_HEADER: u8 = 2;
const WEBUSB_URL: u8 = 3;

const SET_HEADER_LEN: usize = 5;
const CONFIG_SUBSET_LEN: usize = 4;
const FUNCTION_SUBSET_LEN: usize = 3;
const URL_HEADER_LEN: usize = 3;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UrlScheme {
    Http = 0,
    Https = 1,
    /// The URL carries its own scheme.
    Other = 255,
}

/// Configuration store over an EEPROM image.
///
/// ```text
///    0..4   signature "WebL"
///    4..6   version, BCD, little-endian
///    6..22  serial number
///  128..    allowed-origins set, then URL descriptors back to back
/// ```
pub struct EepromStore {
    image: [u8; EEPROM_SIZE],
}

impl EepromStore {
    pub fn from_image(image: [u8; EEPROM_SIZE]) -> Self { EepromStore { image } }

    pub fn image(&self) -> &[u8; EEPROM_SIZE] { &self.image }

    pub fn is_valid(&self) -> bool { self.image[SIG_START..SIG_START + 4] == EEPROM_SIGNATURE }

    pub fn version(&self) -> u16 {
        u16::from_le_bytes([self.image[VERSION_START], self.image[VERSION_START + 1]])
    }

    /// Lays out a fresh image. `origins` lists the URL indices (1-based, into `urls`) the allowed-origins
    /// set names.
    pub fn generate(
        serial: &str,
        urls: &[(UrlScheme, &str)],
        origins: &[u8],
        first_interface: u8,
    ) -> Result<Self, Error> {
        if serial.len() != SERIAL_LEN || !serial.is_ascii() {
            return Err(Error::BadSerial);
        }
        if origins.len() > u8::MAX as usize - FUNCTION_SUBSET_LEN
            || origins.iter().any(|&i| i == 0 || i as usize > urls.len())
        {
            return Err(Error::TooManyOrigins);
        }

        let mut image = [0u8; EEPROM_SIZE];
        image[SIG_START..SIG_START + 4].copy_from_slice(&EEPROM_SIGNATURE);
        image[VERSION_START..VERSION_START + 2].copy_from_slice(&STORE_VERSION.to_le_bytes());
        image[SERIAL_START..SERIAL_START + SERIAL_LEN].copy_from_slice(serial.as_bytes());

        let function_len = FUNCTION_SUBSET_LEN + origins.len();
        let total = SET_HEADER_LEN + CONFIG_SUBSET_LEN + function_len;
        if WEBUSB_START + total > EEPROM_SIZE {
            return Err(Error::NoSpace);
        }
        let total_le = (total as u16).to_le_bytes();
        let set_header = [SET_HEADER_LEN as u8, WEBUSB_DESCRIPTOR_SET_HEADER, total_le[0], total_le[1], 1];
        let config_subset = [CONFIG_SUBSET_LEN as u8, WEBUSB_CONFIGURATION_SUBSET_HEADER, 0, 1];
        let function_subset = [function_len as u8, WEBUSB_FUNCTION_SUBSET_HEADER, first_interface];
        let parts: [&[u8]; 4] = [&set_header, &config_subset, &function_subset, origins];
        let mut idx = WEBUSB_START;
        for p in parts.iter() {
            image[idx..idx + p.len()].copy_from_slice(p);
            idx += p.len();
        }

        for (scheme, url) in urls.iter() {
            let len = URL_HEADER_LEN + url.len();
            if len > u8::MAX as usize {
                return Err(Error::UrlTooLong);
            }
            if idx + len > EEPROM_SIZE {
                return Err(Error::NoSpace);
            }
            image[idx] = len as u8;
            image[idx + 1] = WEBUSB_URL;
            image[idx + 2] = *scheme as u8;
            image[idx + URL_HEADER_LEN..idx + len].copy_from_slice(url.as_bytes());
            idx += len;
        }
        log::debug!("generated store image: {} urls, {} of {} bytes", urls.len(), idx, EEPROM_SIZE);
        Ok(EepromStore { image })
    }

    fn origins_len(&self) -> usize {
        u16::from_le_bytes([self.image[WEBUSB_START + 2], self.image[WEBUSB_START + 3]]) as usize
    }
}

impl ConfigStore for EepromStore {
    fn lookup(&self, index: u16) -> Option<&[u8]> {
        if !self.is_valid() || self.image[WEBUSB_START] == 0 {
            return None;
        }
        let origins_len = self.origins_len();
        if WEBUSB_START + origins_len > EEPROM_SIZE {
            return None;
        }
        if index == 0 {
            return Some(&self.image[WEBUSB_START..WEBUSB_START + origins_len]);
        }
        let mut pos = WEBUSB_START + origins_len;
        let mut current = 1;
        while pos < EEPROM_SIZE {
            let len = self.image[pos] as usize;
            if len == 0 || pos + len > EEPROM_SIZE {
                break;
            }
            if current == index {
                return Some(&self.image[pos..pos + len]);
            }
            pos += len;
            current += 1;
        }
        None
    }

    fn serial_number(&self) -> &[u8] { &self.image[SERIAL_START..SERIAL_START + SERIAL_LEN] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EepromStore {
        EepromStore::generate(
            "0123456789abcdef",
            &[(UrlScheme::Https, "example.org/"), (UrlScheme::Http, "localhost:8000")],
            &[1, 2],
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_header_fields() {
        let s = store();
        assert!(s.is_valid());
        assert_eq!(s.version(), 0x0100);
        assert_eq!(s.serial_number(), b"0123456789abcdef");
        assert_eq!(&s.image()[..6], &[b'W', b'e', b'b', b'L', 0x00, 0x01]);
    }

    #[test]
    fn test_allowed_origins_set() {
        let s = store();
        let origins = s.lookup(0).unwrap();
        assert_eq!(origins, &[5, 0, 14, 0, 1, 4, 1, 0, 1, 5, 2, 0, 1, 2]);
    }

    #[test]
    fn test_url_lookup() {
        let s = store();
        let url = s.lookup(1).unwrap();
        assert_eq!(url.len(), 15);
        assert_eq!(&url[..3], &[15, 3, 1]);
        assert_eq!(&url[3..], b"example.org/");
        let url = s.lookup(2).unwrap();
        assert_eq!(&url[..3], &[17, 3, 0]);
        assert!(s.lookup(3).is_none());
        assert!(s.lookup(0xffff).is_none());
    }

    #[test]
    fn test_blank_image() {
        let s = EepromStore::from_image([0xff; EEPROM_SIZE]);
        assert!(!s.is_valid());
        assert!(s.lookup(0).is_none());
        assert!(s.lookup(1).is_none());
    }

    #[test]
    fn test_generate_errors() {
        assert_eq!(EepromStore::generate("short", &[], &[], 0).err(), Some(Error::BadSerial));
        let long = [b'a'; 253];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(
            EepromStore::generate("0123456789abcdef", &[(UrlScheme::Https, long)], &[], 0).err(),
            Some(Error::UrlTooLong)
        );
        assert_eq!(
            EepromStore::generate("0123456789abcdef", &[(UrlScheme::Https, "a.b")], &[2], 0).err(),
            Some(Error::TooManyOrigins)
        );
        let big = [b'x'; 200];
        let big = core::str::from_utf8(&big).unwrap();
        let urls = [(UrlScheme::Other, big), (UrlScheme::Other, big)];
        assert_eq!(EepromStore::generate("0123456789abcdef", &urls, &[], 0).err(), Some(Error::NoSpace));
    }
}
