//! Receive-side reassembly core for a one-way data-over-WiFi link.
//!
//! A transmitter on the other end of a noisy 802.11 monitor-mode channel
//! stuffs payload blocks into the body of raw data frames, stamping each
//! with a sequence number and bracketing the transmission with PREAMBLE and
//! EOT control frames. This crate listens (or replays a capture), verifies
//! each frame came from the expected transmitter, reorders blocks back into
//! the original byte stream, and writes the result to a sink.
//!
//! Captured frames are handled as borrowed byte slices and staged data
//! lives behind buffer offsets rather than raw pointers. Unsafe code is
//! denied crate-wide except for one explicitly documented raw-fd borrow
//! needed to poll a live capture's selectable descriptor (see
//! `capture::LiveSource::poll_readable`).
#![deny(unsafe_code)]

pub mod capture;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod heap;
pub mod radiotap;
pub mod stats;
pub mod verifier;
pub mod wire;

pub use capture::{request_stop, stop_flag, run, CaptureSource, LiveSource, OfflineSource};
pub use config::{load_from_path, ReceiverConfig};
pub use controller::FrameController;
pub use error::{ReceiverError, Result};
pub use frame::{CaptureMode, CapturedFrame, PacketMeta};
pub use stats::{CaptureState, CaptureStatistics, SourceStats};
