//! Sender verification: is this frame from the transmitter we expect?
//!
//! The transmitter stuffs its identifier into all three 802.11 address
//! fields, so a single mostly-intact field is enough to accept the frame —
//! the channel is noisy enough that requiring all three to match would drop
//! frames that are otherwise perfectly usable.

use crate::frame::CapturedFrame;

fn hamming_distance(a: &[u8], b: &[u8; 6]) -> u32 {
    a.iter().zip(b.iter()).map(|(&x, &y)| (x ^ y).count_ones()).sum()
}

/// Accept the frame if any of addr1/addr2/addr3 is within `threshold` bits
/// (strictly less than) of `expected`.
pub fn verify_sender(frame: &CapturedFrame, expected: &[u8; 6], threshold: u32) -> bool {
    [frame.addr1(), frame.addr2(), frame.addr3()]
        .into_iter()
        .flatten()
        .any(|addr| hamming_distance(addr, expected) < threshold)
}
