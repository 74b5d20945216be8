//! Frame classification: data, control (preamble/EOT), or unrecognized.

use crate::frame::{CaptureMode, CapturedFrame};
use crate::wire;

/// Classification outcome for a single captured frame.
///
/// `None` — naming kept from the original control-frame enum this mirrors —
/// means "not a control frame", i.e. a regular data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    None,
    Preamble,
    Eot,
    Unknown,
}

/// Classify a captured frame by its payload size and, for control-sized
/// payloads, a majority vote over repeated sentinel bytes (spec.md §4.2).
pub fn classify(
    frame: &CapturedFrame,
    mode: CaptureMode,
    expected_payload_block_size: usize,
) -> FrameClass {
    let Some(payload_size) = frame.payload_size(mode) else {
        return FrameClass::Unknown;
    };

    if payload_size == expected_payload_block_size {
        return FrameClass::None;
    }

    if payload_size != wire::CONTROL_FRAME_SIZE {
        return FrameClass::Unknown;
    }

    let Some(payload) = frame.payload(mode) else {
        return FrameClass::Unknown;
    };

    let mut eot_count = 0usize;
    let mut preamble_count = 0usize;
    for &b in payload {
        if b == wire::EOT_SENTINEL {
            eot_count += 1;
        } else if b == wire::PREAMBLE_SENTINEL {
            preamble_count += 1;
        }
    }

    let eot_ratio = eot_count as f64 / payload_size as f64;
    let preamble_ratio = preamble_count as f64 / payload_size as f64;

    if eot_ratio > wire::CHECK_THRESHOLD {
        FrameClass::Eot
    } else if preamble_ratio > wire::CHECK_THRESHOLD {
        FrameClass::Preamble
    } else {
        FrameClass::Unknown
    }
}
