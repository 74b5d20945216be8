//! The frame controller: per-capture state machine owning the staging
//! buffer and ordering heap (spec.md §4.4).

use std::io::Write;

use tracing::{debug, info, warn};

use crate::classifier::{classify, FrameClass};
use crate::config::ReceiverConfig;
use crate::frame::{CaptureMode, CapturedFrame};
use crate::heap::OrderingHeap;
use crate::radiotap;
use crate::stats::CaptureStatistics;
use crate::verifier::verify_sender;

/// Per-capture state machine. Owns the staging buffer and ordering heap for
/// the lifetime of one capture session.
pub struct FrameController<W: Write> {
    config: ReceiverConfig,
    mode: CaptureMode,
    sink: W,
    staging: Vec<u8>,
    write_index: usize,
    heap: OrderingHeap,
    eot_reached: bool,
    preamble_recv: bool,
    end_capture: bool,
    stats: CaptureStatistics,
}

impl<W: Write> FrameController<W> {
    pub fn new(config: ReceiverConfig, mode: CaptureMode, sink: W) -> Self {
        let heap_capacity = config.packet_buffer_size.div_ceil(config.payload_block_size) + 1;
        let staging = vec![0u8; config.packet_buffer_size];
        Self {
            heap: OrderingHeap::with_capacity(heap_capacity),
            staging,
            write_index: 0,
            eot_reached: false,
            preamble_recv: false,
            end_capture: false,
            stats: CaptureStatistics::default(),
            config,
            mode,
            sink,
        }
    }

    /// Whether the outer capture loop should stop dispatching (a second
    /// PREAMBLE arrived after data was already processed).
    pub fn should_end_capture(&self) -> bool {
        self.end_capture
    }

    pub fn stats(&self) -> &CaptureStatistics {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut CaptureStatistics {
        &mut self.stats
    }

    /// Process one captured frame: verify sender, classify, and dispatch to
    /// the control-frame handler or the data path.
    pub fn process_frame(&mut self, frame: &CapturedFrame) {
        if !verify_sender(frame, &self.config.sender_addr, self.config.max_hamming_dist) {
            self.stats.packets_dropped += 1;
            return;
        }

        match classify(frame, self.mode, self.config.payload_block_size) {
            FrameClass::Unknown => {
                warn!(
                    caplen = frame.meta.caplen,
                    wire_len = frame.meta.wire_len,
                    "unknown frame encountered; payload size matched neither data nor control size"
                );
            }
            FrameClass::Preamble => self.handle_preamble(),
            FrameClass::Eot => self.handle_eot(),
            FrameClass::None => self.process_data_frame(frame),
        }
    }

    fn handle_preamble(&mut self) {
        if self.stats.packets_processed > 0 {
            // This preamble belongs to the next transmission.
            self.end_capture = true;
        } else if !self.preamble_recv {
            info!("uplink established");
        }
        self.preamble_recv = true;
    }

    fn handle_eot(&mut self) {
        if !self.eot_reached {
            info!("end-of-transmission signalled");
        }
        self.eot_reached = true;
    }

    fn process_data_frame(&mut self, frame: &CapturedFrame) {
        let Some(payload_size) = frame.payload_size(self.mode) else {
            warn!("malformed frame: cannot compute payload size, dropping");
            return;
        };
        if payload_size != self.config.payload_block_size {
            warn!(
                payload_size,
                expected = self.config.payload_block_size,
                "payload size does not match expected block size"
            );
            return;
        }

        if self.write_index + self.config.payload_block_size >= self.config.packet_buffer_size {
            self.flush();
        }

        let Some(payload) = frame.payload(self.mode) else {
            warn!("malformed frame: payload region unavailable, dropping");
            return;
        };

        let block_size = self.config.payload_block_size;
        self.staging[self.write_index..self.write_index + block_size].copy_from_slice(payload);

        let frame_number = if self.config.ordered {
            let Some(n) = frame.stamped_frame_number() else {
                warn!("ordered mode requires a frame number but addr1 was too short, dropping");
                return;
            };
            n
        } else {
            self.stats.packets_processed as i32
        };

        let crc_valid = match (self.mode, frame.mac_header(), frame.fcs()) {
            (CaptureMode::Live, Some(mac_header), Some(fcs)) => {
                let mut hasher = crc32fast::Hasher::new();
                hasher.update(mac_header);
                hasher.update(payload);
                let computed = hasher.finalize();
                let on_wire = u32::from_le_bytes(fcs);
                computed == on_wire
            }
            // Offline/test captures carry no trailing FCS (spec.md §3): there
            // is nothing to contradict the payload, so treat it as valid.
            _ => true,
        };

        self.heap.push(frame_number, self.write_index, crc_valid);
        self.write_index += block_size;

        self.stats.total_caplen += frame.meta.caplen as u64;
        self.stats.total_payload_size += payload_size as u64;
        self.stats.packets_processed += 1;
        if !crc_valid {
            self.stats.bad_crcs += 1;
        }
        self.stats.last_packet = Some(frame.meta);
        self.stats.last_radiotap = Some(radiotap::decode(frame.bytes));

        debug!(
            frame_number,
            caplen = frame.meta.caplen,
            signal_dbm = ?self.stats.last_radiotap.and_then(|r| r.signal_dbm),
            "data frame staged"
        );
    }

    /// Drain the heap into the sink in ascending frame-number order,
    /// accounting for gaps and resetting the write index (spec.md §4.4.2).
    pub fn flush(&mut self) {
        let Some(root) = self.heap.peek() else {
            self.write_index = 0;
            return;
        };
        let mut expected_frame = root.frame_number;

        while let Some(node) = self.heap.pop() {
            if self.config.ordered && node.frame_number > expected_frame {
                let missing = (node.frame_number - expected_frame) as u64;
                if self.config.add_noise {
                    let noise_block = vec![self.config.noise_value; self.config.payload_block_size];
                    for _ in 0..missing {
                        self.write_to_sink(&noise_block, true);
                    }
                }
                self.stats.total_blocks_lost += missing;
            }

            let block_size = self.config.payload_block_size;
            let data_start = node.data_offset;
            let data = self.staging[data_start..data_start + block_size].to_vec();
            self.write_to_sink(&data, false);

            expected_frame = node.frame_number.wrapping_add(1);
        }

        self.write_index = 0;
    }

    fn write_to_sink(&mut self, data: &[u8], is_noise: bool) {
        match self.sink.write(data) {
            Ok(n) => {
                if is_noise {
                    self.stats.total_noise_added += n as u64;
                } else {
                    self.stats.total_writelen += n as u64;
                }
                if n != data.len() {
                    warn!(written = n, expected = data.len(), "short sink write");
                }
            }
            Err(e) => warn!(error = %e, "sink write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PacketMeta;
    use crate::wire;

    fn base_config() -> ReceiverConfig {
        ReceiverConfig {
            packet_buffer_size: 4 * 16,
            payload_block_size: 16,
            sender_addr: [1, 2, 3, 4, 5, 6],
            max_hamming_dist: 7,
            ..ReceiverConfig::default()
        }
    }

    /// Builds a data frame with `sender_addr` stamped intact into addr2/addr3
    /// (the fields verify_sender can match on) and `frame_number` packed into
    /// the tail of addr1, mirroring how the transmitter actually lays out
    /// these three fields.
    fn data_frame_bytes(
        frame_number: u32,
        payload_byte: u8,
        block_size: usize,
        sender_addr: [u8; 6],
    ) -> Vec<u8> {
        let rtap_len: u16 = 18;
        let mut bytes = vec![0u8; rtap_len as usize];
        bytes[2..4].copy_from_slice(&rtap_len.to_le_bytes());
        bytes.extend(std::iter::repeat(0u8).take(wire::MAC_HEADER_SIZE));
        let mac_start = rtap_len as usize;
        let addr1 = mac_start + 4;
        let addr2 = mac_start + 10;
        let addr3 = mac_start + 16;
        bytes[addr1 + wire::FRAME_NUMBER_ADDR_OFFSET..addr1 + 6]
            .copy_from_slice(&frame_number.to_be_bytes());
        bytes[addr2..addr2 + 6].copy_from_slice(&sender_addr);
        bytes[addr3..addr3 + 6].copy_from_slice(&sender_addr);
        bytes.extend(std::iter::repeat(payload_byte).take(block_size));
        bytes
    }

    fn meta(len: usize) -> PacketMeta {
        PacketMeta { caplen: len as u32, wire_len: len as u32, ts_secs: 0, ts_usecs: 0 }
    }

    #[test]
    fn s1_clean_in_order_concatenates_payloads() {
        let config = base_config();
        let sender = config.sender_addr;
        let mut controller = FrameController::new(config, CaptureMode::Offline, Vec::new());
        for i in 0..4u32 {
            let bytes = data_frame_bytes(i, i as u8, 16, sender);
            let frame = CapturedFrame::new(&bytes, meta(bytes.len()));
            controller.process_frame(&frame);
        }
        controller.flush();
        let expected: Vec<u8> = (0..4u8).flat_map(|i| vec![i; 16]).collect();
        assert_eq!(controller.sink, expected);
        assert_eq!(controller.stats().packets_processed, 4);
        assert_eq!(controller.stats().total_blocks_lost, 0);
    }

    #[test]
    fn s2_reorder_within_one_buffer() {
        // Needs room to stage all 4 blocks of one buffer before the `>=`
        // flush trigger fires; base_config()'s 4*16 flushes after 3.
        let config = ReceiverConfig { packet_buffer_size: 5 * 16, ..base_config() };
        let sender = config.sender_addr;
        let mut controller = FrameController::new(config, CaptureMode::Offline, Vec::new());
        for i in [2u32, 0, 3, 1] {
            let bytes = data_frame_bytes(i, i as u8, 16, sender);
            let frame = CapturedFrame::new(&bytes, meta(bytes.len()));
            controller.process_frame(&frame);
        }
        controller.flush();
        let expected: Vec<u8> = (0..4u8).flat_map(|i| vec![i; 16]).collect();
        assert_eq!(controller.sink, expected);
        assert_eq!(controller.stats().total_blocks_lost, 0);
    }

    #[test]
    fn s3_gap_with_noise() {
        let mut config = base_config();
        config.add_noise = true;
        config.noise_value = 0xFF;
        let sender = config.sender_addr;
        let mut controller = FrameController::new(config, CaptureMode::Offline, Vec::new());
        for i in [0u32, 1, 3] {
            let bytes = data_frame_bytes(i, i as u8, 16, sender);
            let frame = CapturedFrame::new(&bytes, meta(bytes.len()));
            controller.process_frame(&frame);
        }
        controller.flush();
        let mut expected: Vec<u8> = vec![0u8; 16];
        expected.extend(vec![1u8; 16]);
        expected.extend(vec![0xFFu8; 16]);
        expected.extend(vec![3u8; 16]);
        assert_eq!(controller.sink, expected);
        assert_eq!(controller.stats().total_blocks_lost, 1);
        assert_eq!(controller.stats().total_noise_added, 16);
    }

    #[test]
    fn s5_bad_sender_is_dropped() {
        let config = base_config();
        let sender = config.sender_addr;
        let mut controller = FrameController::new(config, CaptureMode::Offline, Vec::new());
        for i in 0..5u32 {
            let mut bytes = data_frame_bytes(i, i as u8, 16, sender);
            // Corrupt all three address fields far from the expected address.
            let rtap_len = 18usize;
            for region in [rtap_len + 4, rtap_len + 10, rtap_len + 16] {
                bytes[region..region + 6].copy_from_slice(&[0xFF; 6]);
            }
            let frame = CapturedFrame::new(&bytes, meta(bytes.len()));
            controller.process_frame(&frame);
        }
        controller.flush();
        assert!(controller.sink.is_empty());
        assert_eq!(controller.stats().packets_dropped, 5);
    }

    #[test]
    fn buffer_full_triggers_flush_before_overrun() {
        let config = base_config(); // capacity for 4 blocks of 16 bytes
        let sender = config.sender_addr;
        let mut controller = FrameController::new(config, CaptureMode::Offline, Vec::new());
        for i in 0..6u32 {
            let bytes = data_frame_bytes(i, i as u8, 16, sender);
            let frame = CapturedFrame::new(&bytes, meta(bytes.len()));
            controller.process_frame(&frame);
        }
        controller.flush();
        let expected: Vec<u8> = (0..6u8).flat_map(|i| vec![i; 16]).collect();
        assert_eq!(controller.sink, expected);
    }
}
