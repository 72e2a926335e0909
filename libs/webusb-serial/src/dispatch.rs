use num_traits::FromPrimitive;

use crate::api::*;
use crate::cursor::{BlobSource, DescriptorBlob, PagedTransferCursor};
use crate::descriptors::DescriptorCatalog;
use crate::notify::NotificationSequencer;
use crate::setup::{Direction, RequestKind, SetupRequest};
use crate::store::ConfigStore;

/// What the device wants done with a setup packet.
#[derive(Debug, Eq, PartialEq)]
pub enum SetupReply<'a> {
    /// Send these bytes as the data stage. Already clamped to wLength.
    Data(&'a [u8]),
    /// Pull the data stage through `UsbHandler::control_in`.
    DeferredIn,
    /// Deliver the data stage through `UsbHandler::control_out`.
    DeferredOut,
    /// No data stage; complete the status stage.
    Ack,
    /// Not supported. The engine must stall EP0.
    Stall,
}

/// Decides the answer to every setup packet, and feeds deferred transfers.
pub struct ControlRequestDispatcher<S> {
    catalog: DescriptorCatalog,
    cursor: PagedTransferCursor,
    store: S,
    line_coding: LineCoding,
    line_coding_raw: [u8; LINE_CODING_LEN],
    control_lines: u16,
    pending_out: Option<CdcRequest>,
}

impl<S: ConfigStore> ControlRequestDispatcher<S> {
    pub fn new(config: DeviceConfig, store: S) -> Self {
        let line_coding = LineCoding::default();
        ControlRequestDispatcher {
            catalog: DescriptorCatalog::new(config),
            cursor: PagedTransferCursor::new(),
            store,
            line_coding,
            line_coding_raw: line_coding.to_bytes(),
            control_lines: 0,
            pending_out: None,
        }
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn line_coding(&self) -> LineCoding { self.line_coding }

    /// Last SET_CONTROL_LINE_STATE value: bit 0 DTR, bit 1 RTS.
    pub fn control_lines(&self) -> u16 { self.control_lines }

    pub fn cursor(&self) -> &PagedTransferCursor { &self.cursor }

    /// Any new setup packet abandons a deferred transfer still in progress.
    pub fn dispatch(
        &mut self,
        request: &SetupRequest,
        sequencer: &mut NotificationSequencer,
        send_empty_frame: &mut bool,
    ) -> SetupReply<'_> {
        log::trace!("setup {:x?}", request.to_bytes());
        self.cursor.retire();
        self.pending_out = None;

        match request.kind() {
            RequestKind::Vendor => self.vendor_request(request),
            RequestKind::Class => self.class_request(request, sequencer, send_empty_frame),
            RequestKind::Standard
                if request.request == USB_REQ_GET_DESCRIPTOR
                    && request.direction() == Direction::DeviceToHost =>
            {
                self.get_descriptor(request)
            }
            _ => {
                log::debug!("unhandled request {:x?}, stalling", request.to_bytes());
                SetupReply::Stall
            }
        }
    }

    fn vendor_request(&mut self, request: &SetupRequest) -> SetupReply<'_> {
        if request.request == WEBUSB_VENDOR_CODE {
            let index = match WebUsbRequest::from_u16(request.index) {
                Some(WebUsbRequest::GetAllowedOrigins) => 0,
                // wValue 0 deliberately serves the allowed-origins set instead of stalling
                Some(WebUsbRequest::GetUrl) => request.value,
                None => {
                    log::debug!("unknown WebUSB request {}", request.index);
                    return SetupReply::Stall;
                }
            };
            return match self.store.lookup(index) {
                Some(entry) => {
                    let blob = DescriptorBlob::new(BlobSource::Store(index), entry.len());
                    self.cursor.arm(blob.truncated(request.length as usize));
                    SetupReply::DeferredIn
                }
                None => {
                    log::debug!("no store entry {}, stalling", index);
                    SetupReply::Stall
                }
            };
        }
        if request.request == WINUSB_VENDOR_CODE && request.index == MS_OS_20_DESCRIPTOR_INDEX {
            let blob = self.catalog.ms_os_20().truncated(request.length as usize);
            return match self.catalog.resolve(blob.source) {
                Some(bytes) => SetupReply::Data(&bytes[..blob.len]),
                None => SetupReply::Stall,
            };
        }
        log::debug!("unknown vendor request {:#x}/{}", request.request, request.index);
        SetupReply::Stall
    }

    fn class_request(
        &mut self,
        request: &SetupRequest,
        sequencer: &mut NotificationSequencer,
        send_empty_frame: &mut bool,
    ) -> SetupReply<'_> {
        if request.direction() == Direction::HostToDevice {
            *send_empty_frame = true;
        }
        match CdcRequest::from_u8(request.request) {
            Some(CdcRequest::SetControlLineState) => {
                self.control_lines = request.value;
                if sequencer.arm() {
                    log::debug!("port opened, lines {:#x}", request.value);
                }
                SetupReply::Ack
            }
            Some(CdcRequest::SetLineCoding) => {
                self.pending_out = Some(CdcRequest::SetLineCoding);
                SetupReply::DeferredOut
            }
            Some(CdcRequest::GetLineCoding) => {
                self.line_coding_raw = self.line_coding.to_bytes();
                let len = LINE_CODING_LEN.min(request.length as usize);
                SetupReply::Data(&self.line_coding_raw[..len])
            }
            Some(CdcRequest::SendBreak) | Some(CdcRequest::SetCommFeature) | Some(CdcRequest::ClearCommFeature) => {
                SetupReply::Ack
            }
            Some(CdcRequest::SendEncapsulatedCommand) => {
                self.pending_out = Some(CdcRequest::SendEncapsulatedCommand);
                SetupReply::DeferredOut
            }
            _ => {
                log::debug!("unsupported class request {:#x}", request.request);
                SetupReply::Stall
            }
        }
    }

    fn get_descriptor(&mut self, request: &SetupRequest) -> SetupReply<'_> {
        let descriptor_type = request.descriptor_type();
        let blob = match self.catalog.descriptor(
            descriptor_type,
            request.descriptor_index(),
            self.store.serial_number(),
        ) {
            Some(blob) => blob.truncated(request.length as usize),
            None => {
                log::debug!(
                    "unsupported descriptor {:#x}/{}, stalling",
                    descriptor_type,
                    request.descriptor_index()
                );
                return SetupReply::Stall;
            }
        };
        if descriptor_type == USB_DT_BOS {
            self.cursor.arm(blob);
            return SetupReply::DeferredIn;
        }
        match self.catalog.resolve(blob.source) {
            Some(bytes) => SetupReply::Data(&bytes[..blob.len]),
            None => SetupReply::Stall,
        }
    }

    /// Next chunk of the armed transfer.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.cursor.is_active() {
            self.cursor.retire();
            return 0;
        }
        let bytes = match self.cursor.source() {
            BlobSource::Store(index) => self.store.lookup(index).unwrap_or(&[]),
            source => self.catalog.resolve(source).unwrap_or(&[]),
        };
        self.cursor.read(bytes, buf)
    }

    pub fn write(&mut self, data: &[u8]) {
        match self.pending_out.take() {
            Some(CdcRequest::SetLineCoding) => match LineCoding::from_bytes(data) {
                Some(coding) => {
                    log::debug!("line coding {:?}", coding);
                    self.line_coding = coding;
                }
                None => log::debug!("ignoring {}-byte line coding", data.len()),
            },
            Some(other) => log::trace!("discarding {:?} payload of {} bytes", other, data.len()),
            None => log::debug!("unexpected control OUT data ({} bytes)", data.len()),
        }
    }
}
