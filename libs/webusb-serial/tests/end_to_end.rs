use hex_literal::hex;
use webusb_serial::api::*;
use webusb_serial::hosted::{ControlOutcome, HostedClock, HostedEngine};
use webusb_serial::notify::NotificationState;
use webusb_serial::setup::{Direction, RequestKind, Recipient};
use webusb_serial::{Clock, EepromStore, SerialStream, SetupRequest, UrlScheme, WebUsbSerial};

type Device = WebUsbSerial<HostedEngine, HostedClock, EepromStore>;

fn init_logger() { let _ = env_logger::builder().is_test(true).try_init(); }

fn device_with(urls: &[(UrlScheme, &str)], config: DeviceConfig) -> Device {
    init_logger();
    let store = EepromStore::generate("WL00000000000042", urls, &[1], 0).unwrap();
    let mut dev = WebUsbSerial::new(HostedEngine::new(), HostedClock::new(), store, config);
    dev.begin();
    dev
}

fn device() -> Device { device_with(&[(UrlScheme::Https, "example.org/")], DeviceConfig::default()) }

fn control(dev: &mut Device, request: SetupRequest, data: &[u8]) -> ControlOutcome {
    dev.engine_mut().queue_control(request, data);
    dev.poll();
    dev.engine_mut().take_outcome().unwrap()
}

fn get_descriptor(descriptor_type: u8, index: u8, length: u16) -> SetupRequest {
    SetupRequest::new(
        Direction::DeviceToHost,
        RequestKind::Standard,
        Recipient::Device,
        USB_REQ_GET_DESCRIPTOR,
        ((descriptor_type as u16) << 8) | index as u16,
        0,
        length,
    )
}

fn vendor_in(request: u8, value: u16, index: u16, length: u16) -> SetupRequest {
    SetupRequest::new(Direction::DeviceToHost, RequestKind::Vendor, Recipient::Device, request, value, index, length)
}

#[test]
fn test_get_url_in_two_packets() {
    // 3 header bytes + 9 characters
    let mut dev = device_with(&[(UrlScheme::Https, "webusb.io")], DeviceConfig::default());
    let outcome = control(&mut dev, vendor_in(WEBUSB_VENDOR_CODE, 1, 2, 0xff), &[]);
    match outcome {
        ControlOutcome::In { data, packets } => {
            assert_eq!(packets, vec![8, 4]);
            assert_eq!(data.len(), 12);
            assert_eq!(&data[..3], &[12, 3, 1]);
            assert_eq!(&data[3..], b"webusb.io");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_get_url_unknown_index_stalls() {
    let mut dev = device();
    assert_eq!(control(&mut dev, vendor_in(WEBUSB_VENDOR_CODE, 5, 2, 0xff), &[]), ControlOutcome::Stall);
    // the device keeps answering afterwards
    assert!(matches!(
        control(&mut dev, vendor_in(WEBUSB_VENDOR_CODE, 0, 1, 0xff), &[]),
        ControlOutcome::In { .. }
    ));
}

#[test]
fn test_enumeration_descriptors() {
    let mut dev = device();
    match control(&mut dev, get_descriptor(USB_DT_DEVICE, 0, 0x40), &[]) {
        ControlOutcome::In { data, packets } => {
            assert_eq!(data, hex!("1201100202000008c016e105000101020301").to_vec());
            assert_eq!(packets, vec![8, 8, 2]);
        }
        other => panic!("unexpected {:?}", other),
    }
    match control(&mut dev, get_descriptor(USB_DT_CONFIG, 0, 0xff), &[]) {
        ControlOutcome::In { data, .. } => assert_eq!(data.len(), 67),
        other => panic!("unexpected {:?}", other),
    }
    match control(&mut dev, get_descriptor(USB_DT_STRING, STRING_INDEX_SERIAL, 0xff), &[]) {
        ControlOutcome::In { data, .. } => {
            assert_eq!(data.len(), 34);
            let serial: Vec<u8> = data[2..].chunks(2).map(|c| c[0]).collect();
            assert_eq!(serial, b"WL00000000000042".to_vec());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_bos_and_ms_os_agree() {
    let mut dev = device();
    let bos = match control(&mut dev, get_descriptor(USB_DT_BOS, 0, 0xff), &[]) {
        ControlOutcome::In { data, .. } => data,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(
        bos,
        hex!(
            "050f390002"
            "1810050038b60834a909a0478bfda0768815b6650001ff01"
            "1c100500df60ddd88945c74c9cd2659d9e648a9f000003061e00fe00"
        )
        .to_vec()
    );
    let advertised = u16::from_le_bytes([bos[53], bos[54]]) as usize;
    let set = match control(&mut dev, vendor_in(bos[55], 0, MS_OS_20_DESCRIPTOR_INDEX, advertised as u16), &[]) {
        ControlOutcome::In { data, .. } => data,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(set.len(), advertised);
}

#[test]
fn test_extended_ms_os_set() {
    let config = DeviceConfig { ms_os: MsOsVariant::Extended, first_interface: 0, ..Default::default() };
    let mut dev = device_with(&[(UrlScheme::Https, "example.org/")], config);
    let bos = match control(&mut dev, get_descriptor(USB_DT_BOS, 0, 0xff), &[]) {
        ControlOutcome::In { data, .. } => data,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(&bos[53..55], &[0x2e, 0x00]);
    match control(&mut dev, vendor_in(WINUSB_VENDOR_CODE, 0, MS_OS_20_DESCRIPTOR_INDEX, 0x2e), &[]) {
        ControlOutcome::In { data, .. } => {
            assert_eq!(data.len(), 0x2e);
            assert_eq!(data[22], 0);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_write_overflow_ticks_once_per_refusal() {
    let mut dev = device();
    dev.engine_mut().set_data_ready(false);
    let polls = dev.engine().polls();
    let payload: Vec<u8> = (0..40u8).collect();
    let accepted: Vec<usize> = payload.iter().map(|&b| dev.write_byte(b)).collect();
    assert_eq!(accepted.iter().filter(|&&n| n == 1).count(), 32);
    assert!(accepted[..32].iter().all(|&n| n == 1));
    assert!(accepted[32..].iter().all(|&n| n == 0));
    assert_eq!(dev.engine().polls() - polls, 8);
    assert_eq!(dev.pending_out(), TX_BUF_SIZE);

    // once the host reads, the data goes out in packets with a ZLP after each
    dev.engine_mut().set_data_ready(true);
    for _ in 0..8 {
        dev.poll();
    }
    let frames = dev.engine().data_frames();
    assert_eq!(frames.len(), 8);
    assert_eq!(frames[0], (0..8u8).collect::<Vec<u8>>());
    assert!(frames[1].is_empty());
    assert_eq!(dev.pending_out(), 0);
}

#[test]
fn test_open_sends_serial_state() {
    let mut dev = device();
    let open =
        SetupRequest::new(Direction::HostToDevice, RequestKind::Class, Recipient::Interface, 0x22, 0x0003, 0, 0);
    assert_eq!(control(&mut dev, open, &[]), ControlOutcome::Ack);
    // the same tick already delivered the first half
    assert_eq!(dev.notification_state(), NotificationState::PendingShort);
    // a second open while pending changes nothing
    assert_eq!(control(&mut dev, open, &[]), ControlOutcome::Ack);
    dev.poll();
    dev.poll();
    let frames = dev.engine().notify_frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], hex!("a120000000000200").to_vec());
    assert_eq!(frames[1], hex!("0300").to_vec());
    assert_eq!(dev.control_lines(), 3);
    // each open is a host-to-device class request, so each one arms an empty frame
    assert_eq!(dev.engine().data_frames(), &[Vec::<u8>::new(), Vec::new()]);
}

#[test]
fn test_set_line_coding() {
    let mut dev = device();
    let set = SetupRequest::new(Direction::HostToDevice, RequestKind::Class, Recipient::Interface, 0x20, 0, 0, 7);
    assert_eq!(control(&mut dev, set, &hex!("80250000000008")), ControlOutcome::Ack);
    assert_eq!(dev.line_coding().data_rate, 9600);
    let get = SetupRequest::new(Direction::DeviceToHost, RequestKind::Class, Recipient::Interface, 0x21, 0, 0, 7);
    match control(&mut dev, get, &[]) {
        ControlOutcome::In { data, .. } => assert_eq!(data, hex!("80250000000008").to_vec()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_echo() {
    let mut dev = device();
    dev.engine_mut().queue_data_out(b"hi");
    assert_eq!(dev.available(), 2);
    let mut line = Vec::new();
    while let Some(b) = dev.read_byte() {
        line.push(b.to_ascii_uppercase());
    }
    assert_eq!(dev.write(&line), 2);
    dev.poll();
    assert_eq!(dev.engine().data_frames().last().unwrap(), &b"HI".to_vec());
}

#[test]
fn test_delay_across_clock_wrap() {
    init_logger();
    let store = EepromStore::generate("WL00000000000042", &[], &[], 0).unwrap();
    let mut dev = WebUsbSerial::new(
        HostedEngine::new(),
        HostedClock::starting_at(u32::MAX - 3),
        store,
        DeviceConfig::default(),
    );
    let polls = dev.engine().polls();
    dev.delay(10);
    assert_eq!(dev.engine().polls() - polls, 10);
    assert_eq!(dev.clock().millis(), 6);
}
