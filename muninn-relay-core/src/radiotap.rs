//! Thin adapter over the `radiotap` crate.
//!
//! The frame layout only needs one thing from the radiotap header to find
//! the MAC header and payload: its total length, which sits at a fixed
//! byte offset regardless of which optional fields are present. Reading it
//! is a two-byte load, not a full TLV walk, so [`header_len`] does that
//! directly rather than invoking the full decoder. The full decoder is
//! reserved for [`decode`], which produces the informational fields this
//! core reports in [`crate::stats::CaptureStatistics`] but never uses to
//! make reassembly decisions.

use radiotap::Radiotap;
use tracing::warn;

/// Per-frame radio metadata surfaced in capture statistics.
///
/// Every field is `None` when the capturing radio didn't report it — not
/// every adapter populates every radiotap field.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RadiotapInfo {
    pub signal_dbm: Option<i8>,
    pub channel_freq: Option<u16>,
    pub mcs_index: Option<u8>,
    pub antenna: Option<u8>,
    pub tsft: Option<u64>,
    pub flags: Option<u8>,
}

/// Read the total radiotap header length (`it_len`) from a captured frame.
///
/// The field lives at byte offset 2 as a little-endian `u16` in every
/// radiotap header, per the radiotap spec's fixed prefix
/// (`version`, `pad`, `len`, `present`...). Returns `None` if `frame` is too
/// short to contain even that much.
pub fn header_len(frame: &[u8]) -> Option<usize> {
    let len_bytes: [u8; 2] = frame.get(2..4)?.try_into().ok()?;
    Some(u16::from_le_bytes(len_bytes) as usize)
}

/// Decode the full radiotap header into [`RadiotapInfo`].
///
/// On a malformed header this logs a warning and returns the default
/// (all-`None`) info rather than failing the frame — radiotap decode is
/// purely informational here (see spec.md §4.3).
pub fn decode(frame: &[u8]) -> RadiotapInfo {
    match Radiotap::from_bytes(frame) {
        Ok(parsed) => RadiotapInfo {
            signal_dbm: parsed.antenna_signal.map(|s| s.value),
            channel_freq: parsed.channel.map(|c| c.freq),
            mcs_index: parsed.mcs.as_ref().map(|m| m.mcs),
            antenna: parsed.antenna.map(|a| a.0),
            tsft: parsed.tsft.map(|t| t.0),
            flags: parsed.flags.map(|f| f.bits()),
        },
        Err(e) => {
            warn!(error = %e, "malformed radiotap header");
            RadiotapInfo::default()
        }
    }
}
