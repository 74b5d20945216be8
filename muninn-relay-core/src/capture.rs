//! The capture loop: a readiness-driven dispatch loop over a [`CaptureSource`],
//! feeding captured frames to a [`FrameController`] (spec.md §4.5).

use std::io::Write;
use std::os::unix::io::{AsRawFd, BorrowedFd, RawFd};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{info, warn};

use crate::config::ReceiverConfig;
use crate::controller::FrameController;
use crate::error::{ReceiverError, Result};
use crate::frame::{CaptureMode, CapturedFrame, PacketMeta};
use crate::stats::{CaptureState, CaptureStatistics, SourceStats};

/// DLT_IEEE802_11_RADIOTAP, the libpcap link-layer type for 802.11 frames
/// prefixed with a radiotap header.
const RADIOTAP_LINKTYPE: pcap::Linktype = pcap::Linktype(127);

/// An owned copy of one captured frame. Capture sources hand back owned
/// bytes rather than a borrow tied to their own `&mut self`, so the
/// dispatch loop below can hold the source and the controller at once.
pub struct OwnedFrame {
    pub bytes: Vec<u8>,
    pub meta: PacketMeta,
}

/// Result of asking a capture source for its next frame.
pub enum RecvOutcome {
    Frame(OwnedFrame),
    /// Nothing buffered right now; try again after the next readiness wait.
    WouldBlock,
    /// The source is exhausted and will never produce another frame
    /// (end of an offline replay file).
    Eof,
}

/// Abstraction over "a thing that produces 802.11 frames", so the dispatch
/// loop doesn't care whether it's reading a live radio or replaying a file.
pub trait CaptureSource {
    /// Block up to `timeout_ms` for the source to become readable. Sources
    /// with no underlying file descriptor (offline replay) return `true`
    /// immediately — there's nothing to wait on.
    fn poll_readable(&self, timeout_ms: i32) -> Result<bool>;

    fn recv(&mut self) -> Result<RecvOutcome>;

    /// Capture-source-level counters, gathered once the loop has stopped.
    fn source_stats(&mut self) -> Result<SourceStats>;
}

/// A live monitor-mode capture, backed by `pcap`.
pub struct LiveSource {
    cap: pcap::Capture<pcap::Active>,
}

impl LiveSource {
    pub fn open(device: &str, config: &ReceiverConfig) -> Result<Self> {
        let mut cap = pcap::Capture::from_device(device)?
            .promisc(true)
            .rfmon(true)
            .snaplen(config.snaplen)
            .timeout(config.pb_timeout)
            .open()?;

        cap.set_datalink(RADIOTAP_LINKTYPE).map_err(|_| {
            ReceiverError::InvalidDatalink(format!(
                "interface {device} does not support 802.11 radiotap capture"
            ))
        })?;

        if let Some(expr) = &config.filter {
            cap.filter(expr, config.optimize)?;
        }

        let cap = cap.setnonblock()?;
        info!(device, "live capture opened");
        Ok(Self { cap })
    }
}

impl CaptureSource for LiveSource {
    // `pcap::Capture` exposes its descriptor only via `AsRawFd`, not the
    // safe `AsFd`, so borrowing it for `nix::poll` needs one explicit
    // unsafe step; denied everywhere else in this crate.
    #[allow(unsafe_code)]
    fn poll_readable(&self, timeout_ms: i32) -> Result<bool> {
        let raw_fd: RawFd = self.cap.as_raw_fd();
        // SAFETY: `raw_fd` is borrowed from `self.cap` for the duration of
        // this call and outlives the `BorrowedFd`; `self.cap` is not closed
        // or moved while this function runs.
        let fd = unsafe { BorrowedFd::borrow_raw(raw_fd) };
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let timeout = PollTimeout::try_from(timeout_ms).unwrap_or(PollTimeout::MAX);
        let n = poll(&mut fds, timeout)?;
        Ok(n > 0)
    }

    fn recv(&mut self) -> Result<RecvOutcome> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(RecvOutcome::Frame(OwnedFrame {
                bytes: packet.data.to_vec(),
                meta: PacketMeta {
                    caplen: packet.header.caplen,
                    wire_len: packet.header.len,
                    ts_secs: packet.header.ts.tv_sec as i64,
                    ts_usecs: packet.header.ts.tv_usec as i64,
                },
            })),
            Err(pcap::Error::TimeoutExpired) => Ok(RecvOutcome::WouldBlock),
            Err(pcap::Error::NoMorePackets) => Ok(RecvOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn source_stats(&mut self) -> Result<SourceStats> {
        let stat = self.cap.stats()?;
        Ok(SourceStats { received: stat.received, dropped: stat.dropped, if_dropped: stat.if_dropped })
    }
}

/// An offline replay of a previously saved pcap file. No file descriptor to
/// wait on; frames are already fully buffered on disk.
pub struct OfflineSource {
    cap: pcap::Capture<pcap::Offline>,
}

impl OfflineSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let cap = pcap::Capture::from_file(path)?;
        Ok(Self { cap })
    }
}

impl CaptureSource for OfflineSource {
    fn poll_readable(&self, _timeout_ms: i32) -> Result<bool> {
        Ok(true)
    }

    fn recv(&mut self) -> Result<RecvOutcome> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(RecvOutcome::Frame(OwnedFrame {
                bytes: packet.data.to_vec(),
                meta: PacketMeta {
                    caplen: packet.header.caplen,
                    wire_len: packet.header.len,
                    ts_secs: packet.header.ts.tv_sec as i64,
                    ts_usecs: packet.header.ts.tv_usec as i64,
                },
            })),
            Err(pcap::Error::NoMorePackets) => Ok(RecvOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn source_stats(&mut self) -> Result<SourceStats> {
        Ok(SourceStats::default())
    }
}

/// Creates a shared stop flag. Clone it into a signal handler and call
/// [`request_stop`] to have the running capture loop return after its
/// current dispatch batch.
pub fn stop_flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

pub fn request_stop(flag: &Arc<AtomicBool>) {
    flag.store(true, Ordering::Relaxed);
}

/// Run the capture loop to completion: poll for readiness, dispatch up to
/// `dispatch_count` frames per wakeup, and stop on external signal, idle
/// timeout, source error, or a second PREAMBLE (spec.md §4.4.1).
pub fn run<S: CaptureSource, W: Write>(
    mut source: S,
    config: ReceiverConfig,
    mode: CaptureMode,
    sink: W,
    stop: Arc<AtomicBool>,
) -> CaptureStatistics {
    let poll_interval_ms = config.pb_timeout.max(1) as u64;
    let timeout_ms_total = config.capture_timeout.saturating_mul(1000);
    let dispatch_count = config.dispatch_count.max(1);
    let mut idle_elapsed_ms: u64 = 0;

    let mut controller = FrameController::new(config.clone(), mode, sink);

    'outer: loop {
        if stop.load(Ordering::Relaxed) {
            info!("capture stopped by external signal");
            controller.stats_mut().capture_state = CaptureState::Deactivated;
            break;
        }

        match source.poll_readable(config.pb_timeout) {
            Ok(true) => idle_elapsed_ms = 0,
            Ok(false) => {
                idle_elapsed_ms += poll_interval_ms;
                if timeout_ms_total > 0 && idle_elapsed_ms >= timeout_ms_total {
                    warn!(capture_timeout = config.capture_timeout, "capture timed out waiting for frames");
                    controller.stats_mut().capture_state = CaptureState::TimedOut;
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(error = %e, "readiness poll failed");
                controller.stats_mut().capture_state = CaptureState::Error;
                break;
            }
        }

        for _ in 0..dispatch_count {
            match source.recv() {
                Ok(RecvOutcome::Frame(owned)) => {
                    let frame = CapturedFrame::new(&owned.bytes, owned.meta);
                    controller.process_frame(&frame);
                    if controller.should_end_capture() {
                        break 'outer;
                    }
                }
                Ok(RecvOutcome::WouldBlock) => break,
                Ok(RecvOutcome::Eof) => {
                    info!("capture source exhausted");
                    break 'outer;
                }
                Err(e) => {
                    warn!(error = %e, "capture source read failed");
                    controller.stats_mut().capture_state = CaptureState::Error;
                    break 'outer;
                }
            }
        }
    }

    controller.flush();
    match source.source_stats() {
        Ok(stats) => controller.stats_mut().source_stats = Some(stats),
        Err(e) => warn!(error = %e, "failed to read capture source statistics"),
    }
    controller.stats().clone()
}
