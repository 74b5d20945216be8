//! The borrowed, non-owning view over a single captured frame.

use crate::radiotap;
use crate::wire;

/// Whether the capture source is a live radio (trailing FCS present) or an
/// offline replay (FCS already stripped). Resolved once at receiver
/// construction, per Design Note §9 — never branched on per frame beyond
/// this flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Live,
    Offline,
}

impl CaptureMode {
    fn fcs_size(self) -> usize {
        match self {
            CaptureMode::Live => wire::FCS_SIZE,
            CaptureMode::Offline => 0,
        }
    }
}

/// Packet-level metadata accompanying a captured frame.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PacketMeta {
    pub caplen: u32,
    pub wire_len: u32,
    pub ts_secs: i64,
    pub ts_usecs: i64,
}

/// A captured frame as a borrowed byte slice plus its metadata.
///
/// The slice is logically partitioned into radiotap header, IEEE 802.11 MAC
/// header, payload, and (live mode only) a trailing 4-byte FCS. All
/// accessors return `None` on a frame too short to contain the requested
/// region rather than panicking — malformed frames are expected on a noisy
/// channel and are the classifier's job to reject, not this view's.
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    pub bytes: &'a [u8],
    pub meta: PacketMeta,
}

impl<'a> CapturedFrame<'a> {
    pub fn new(bytes: &'a [u8], meta: PacketMeta) -> Self {
        Self { bytes, meta }
    }

    /// Length of the radiotap header prefix, read directly from the header.
    pub fn radiotap_len(&self) -> Option<usize> {
        radiotap::header_len(self.bytes)
    }

    /// Number of payload bytes, per spec.md §4.2:
    /// `caplen - radiotap_len - mac_header_size - (live ? fcs_size : 0)`.
    pub fn payload_size(&self, mode: CaptureMode) -> Option<usize> {
        self.bytes
            .len()
            .checked_sub(self.radiotap_len()?)?
            .checked_sub(wire::MAC_HEADER_SIZE)?
            .checked_sub(mode.fcs_size())
    }

    /// The fixed-size IEEE 802.11 MAC header region.
    pub fn mac_header(&self) -> Option<&'a [u8]> {
        let start = self.radiotap_len()?;
        self.bytes.get(start..start + wire::MAC_HEADER_SIZE)
    }

    /// The payload region, sized per `payload_size`.
    pub fn payload(&self, mode: CaptureMode) -> Option<&'a [u8]> {
        let start = self.radiotap_len()? + wire::MAC_HEADER_SIZE;
        let size = self.payload_size(mode)?;
        self.bytes.get(start..start + size)
    }

    /// The trailing 4-byte FCS. Only meaningful in `Live` mode; callers in
    /// `Offline` mode should not call this.
    pub fn fcs(&self) -> Option<[u8; wire::FCS_SIZE]> {
        let n = self.bytes.len();
        let start = n.checked_sub(wire::FCS_SIZE)?;
        self.bytes.get(start..n)?.try_into().ok()
    }

    fn addr_field(&self, offset: usize) -> Option<&'a [u8]> {
        self.mac_header()?.get(offset..offset + 6)
    }

    pub fn addr1(&self) -> Option<&'a [u8]> {
        self.addr_field(4)
    }

    pub fn addr2(&self) -> Option<&'a [u8]> {
        self.addr_field(10)
    }

    pub fn addr3(&self) -> Option<&'a [u8]> {
        self.addr_field(16)
    }

    /// The transmitter-stamped frame number packed into bytes 2-5 of addr1.
    pub fn stamped_frame_number(&self) -> Option<i32> {
        let addr1 = self.addr1()?;
        let bytes: [u8; 4] = addr1.get(wire::FRAME_NUMBER_ADDR_OFFSET..).and_then(|s| s.get(..4))?.try_into().ok()?;
        Some(i32::from_be_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_frame(radiotap_len: u16, payload: &[u8], fcs: Option<[u8; 4]>) -> Vec<u8> {
        let mut bytes = vec![0u8; radiotap_len as usize];
        bytes[2..4].copy_from_slice(&radiotap_len.to_le_bytes());
        bytes.extend(std::iter::repeat(0u8).take(wire::MAC_HEADER_SIZE));
        bytes.extend_from_slice(payload);
        if let Some(fcs) = fcs {
            bytes.extend_from_slice(&fcs);
        }
        bytes
    }

    fn meta(caplen: u32) -> PacketMeta {
        PacketMeta { caplen, wire_len: caplen, ts_secs: 0, ts_usecs: 0 }
    }

    #[test]
    fn payload_size_accounts_for_fcs_in_live_mode() {
        let payload = vec![0xAB; 64];
        let bytes = build_frame(18, &payload, Some([1, 2, 3, 4]));
        let frame = CapturedFrame::new(&bytes, meta(bytes.len() as u32));
        assert_eq!(frame.payload_size(CaptureMode::Live), Some(64));
        assert_eq!(frame.payload(CaptureMode::Live), Some(payload.as_slice()));
    }

    #[test]
    fn payload_size_has_no_fcs_in_offline_mode() {
        let payload = vec![0xCD; 32];
        let bytes = build_frame(18, &payload, None);
        let frame = CapturedFrame::new(&bytes, meta(bytes.len() as u32));
        assert_eq!(frame.payload_size(CaptureMode::Offline), Some(32));
    }

    #[test]
    fn frame_number_reads_big_endian_from_addr1_tail() {
        let mut bytes = build_frame(18, &[0u8; 16], None);
        let rtap_len = 18usize;
        let addr1_start = rtap_len + 4;
        bytes[addr1_start..addr1_start + 6].copy_from_slice(&[0xAA, 0xBB, 0x00, 0x00, 0x01, 0x2C]);
        let frame = CapturedFrame::new(&bytes, meta(bytes.len() as u32));
        assert_eq!(frame.stamped_frame_number(), Some(0x0000_012C));
    }

    #[test]
    fn too_short_frame_returns_none_everywhere() {
        let bytes = [0u8; 4];
        let frame = CapturedFrame::new(&bytes, meta(4));
        assert_eq!(frame.mac_header(), None);
        assert_eq!(frame.payload(CaptureMode::Live), None);
    }
}
