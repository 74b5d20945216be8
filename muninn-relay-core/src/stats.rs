//! Capture-wide statistics returned to the caller on completion.

use serde::Serialize;

use crate::frame::PacketMeta;
use crate::radiotap::RadiotapInfo;

/// Terminal state of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureState {
    #[default]
    Normal,
    TimedOut,
    Error,
    Deactivated,
}

/// Capture-source-level statistics (drops, interface drops), gathered once
/// at the end of a capture from whatever the capture source reports.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SourceStats {
    pub received: u32,
    pub dropped: u32,
    pub if_dropped: u32,
}

/// Running and final statistics for one capture session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureStatistics {
    pub packets_processed: u64,
    pub packets_dropped: u64,
    pub bad_crcs: u64,
    pub total_caplen: u64,
    pub total_payload_size: u64,
    pub total_writelen: u64,
    pub total_noise_added: u64,
    pub total_blocks_lost: u64,
    pub last_packet: Option<PacketMeta>,
    pub last_radiotap: Option<RadiotapInfo>,
    pub source_stats: Option<SourceStats>,
    pub capture_state: CaptureState,
}
