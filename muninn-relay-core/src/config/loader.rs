use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{ReceiverError, Result};

use super::ReceiverConfig;

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<ReceiverConfig> {
    let txt = fs::read_to_string(p)
        .map_err(|e| ReceiverError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: ReceiverConfig = toml::from_str(&txt)
        .map_err(|e| ReceiverError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &ReceiverConfig) -> Result<()> {
    if cfg.payload_block_size == 0 {
        return Err(ReceiverError::Config("payload_block_size must be non-zero".into()));
    }

    if cfg.packet_buffer_size < cfg.payload_block_size {
        return Err(ReceiverError::Config(format!(
            "packet_buffer_size ({}) must be at least payload_block_size ({})",
            cfg.packet_buffer_size, cfg.payload_block_size
        )));
    }

    // Two halves of a 6-byte address: a 32-bit and a 16-bit span, 48 bits total.
    if cfg.max_hamming_dist > 48 {
        return Err(ReceiverError::Config(format!(
            "max_hamming_dist ({}) cannot exceed 48 bits",
            cfg.max_hamming_dist
        )));
    }

    if cfg.noise_value != 0 && !cfg.add_noise {
        warn!(
            noise_value = cfg.noise_value,
            "noise_value is set but add_noise is false; noise will never be written"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("tempfile");
        f.write_all(contents.as_bytes()).expect("write");
        f
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let f = write_config("sender_addr = [1, 2, 3, 4, 5, 6]\n");
        let cfg = load_from_path(f.path()).expect("load");
        assert_eq!(cfg.sender_addr, [1, 2, 3, 4, 5, 6]);
        assert_eq!(cfg.payload_block_size, 1024);
        assert!(cfg.ordered);
    }

    #[test]
    fn rejects_buffer_smaller_than_block() {
        let f = write_config(
            "sender_addr = [1, 2, 3, 4, 5, 6]\npacket_buffer_size = 10\npayload_block_size = 1024\n",
        );
        let err = load_from_path(f.path()).unwrap_err();
        assert!(matches!(err, ReceiverError::Config(_)));
    }

    #[test]
    fn rejects_missing_file() {
        let err = load_from_path("/nonexistent/path/receiver.toml").unwrap_err();
        assert!(matches!(err, ReceiverError::Config(_)));
    }

    #[test]
    fn rejects_hamming_dist_over_48_bits() {
        let f = write_config(
            "sender_addr = [1, 2, 3, 4, 5, 6]\nmax_hamming_dist = 49\n",
        );
        let err = load_from_path(f.path()).unwrap_err();
        assert!(matches!(err, ReceiverError::Config(_)));
    }
}
