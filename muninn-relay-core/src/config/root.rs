use serde::Deserialize;

/// Receiver configuration.
///
/// Deserialized from TOML by [`super::load_from_path`]. Every field here
/// corresponds to a receiver-configuration option consumed by the frame
/// controller and capture loop; none of it is interpreted by this crate's
/// CLI layer.
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    /// Seconds of readiness inactivity before the capture ends with `TimedOut`.
    /// Default: 60.
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout: u64,

    /// Size in bytes of the staging buffer used to reorder payload blocks
    /// before they are flushed to the sink.
    /// Default: 131072 (128 KiB).
    #[serde(default = "default_packet_buffer_size")]
    pub packet_buffer_size: usize,

    /// Size in bytes of a single payload block (one per data frame).
    /// Default: 1024.
    #[serde(default = "default_payload_block_size")]
    pub payload_block_size: usize,

    /// Maximum Hamming distance, in bits, between a captured address field
    /// and `sender_addr` for the frame to be accepted.
    /// Default: 7.
    #[serde(default = "default_max_hamming_dist")]
    pub max_hamming_dist: u32,

    /// When true, reorder data blocks by the transmitter-stamped frame
    /// number and account for gaps. When false, blocks are written in
    /// arrival order and no gap can be detected.
    /// Default: true.
    #[serde(default = "default_true")]
    pub ordered: bool,

    /// When true and `ordered` is true, fill detected gaps with
    /// `noise_value`-repeated blocks before the next present block.
    /// Default: false.
    #[serde(default)]
    pub add_noise: bool,

    /// Byte value used to fill a noise block when `add_noise` is set.
    /// Default: 0.
    #[serde(default)]
    pub noise_value: u8,

    /// Expected 6-byte transmitter address, stuffed into addr1/addr2/addr3
    /// by the sender.
    pub sender_addr: [u8; 6],

    /// Optional BPF filter expression applied at the capture source.
    /// Default: None (no filter).
    #[serde(default)]
    pub filter: Option<String>,

    /// Whether to ask the capture source to optimize the compiled filter.
    /// Default: true.
    #[serde(default = "default_true")]
    pub optimize: bool,

    /// Capture snapshot length forwarded to the capture source.
    /// Default: 65535.
    #[serde(default = "default_snaplen")]
    pub snaplen: i32,

    /// Capture source packet-buffer timeout in milliseconds, forwarded
    /// verbatim to the capture source.
    /// Default: 100.
    #[serde(default = "default_pb_timeout")]
    pub pb_timeout: i32,

    /// Maximum frames dispatched per readiness wakeup.
    /// Default: 10.
    #[serde(default = "default_dispatch_count")]
    pub dispatch_count: i32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            capture_timeout: default_capture_timeout(),
            packet_buffer_size: default_packet_buffer_size(),
            payload_block_size: default_payload_block_size(),
            max_hamming_dist: default_max_hamming_dist(),
            ordered: true,
            add_noise: false,
            noise_value: 0,
            sender_addr: [0; 6],
            filter: None,
            optimize: true,
            snaplen: default_snaplen(),
            pb_timeout: default_pb_timeout(),
            dispatch_count: default_dispatch_count(),
        }
    }
}

fn default_capture_timeout() -> u64 {
    60
}

fn default_packet_buffer_size() -> usize {
    128 * 1024
}

fn default_payload_block_size() -> usize {
    1024
}

fn default_max_hamming_dist() -> u32 {
    7
}

fn default_snaplen() -> i32 {
    65535
}

fn default_pb_timeout() -> i32 {
    100
}

fn default_dispatch_count() -> i32 {
    10
}

fn default_true() -> bool {
    true
}
