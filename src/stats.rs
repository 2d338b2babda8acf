/*!
 * Run statistics
 */

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Result of a completed combine run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombineStats {
    /// Size of the first input on disk
    pub first_len: u64,
    /// Size of the second input on disk
    pub second_len: u64,
    /// Bytes taken from each input
    pub combined_len: u64,
    /// Bytes written to the output (always `2 * combined_len`)
    pub bytes_written: u64,
    pub chunk_size: u64,
    pub chunk_count: usize,
    pub workers: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl CombineStats {
    /// Bytes read from both inputs together
    pub fn bytes_read(&self) -> u64 {
        2 * self.combined_len
    }

    /// True when the longer input was cut to the shorter one
    pub fn truncated(&self) -> bool {
        self.first_len != self.second_len
    }

    /// Output bytes per second of wall-clock time
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_written as f64 / secs
        } else {
            0.0
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CombineStats {
        CombineStats {
            first_len: 1024,
            second_len: 1024,
            combined_len: 1024,
            bytes_written: 2048,
            chunk_size: 256,
            chunk_count: 4,
            workers: 2,
            duration: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_throughput() {
        let stats = sample();
        assert_eq!(stats.bytes_read(), 2048);
        assert!((stats.throughput_bps() - 4096.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_duration_throughput() {
        let stats = CombineStats {
            duration: Duration::ZERO,
            ..sample()
        };
        assert_eq!(stats.throughput_bps(), 0.0);
    }

    #[test]
    fn test_truncated() {
        assert!(!sample().truncated());
        let stats = CombineStats {
            second_len: 2000,
            ..sample()
        };
        assert!(stats.truncated());
    }

    #[test]
    fn test_json_output() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["bytes_written"], 2048);
        assert_eq!(value["chunk_count"], 4);
        assert_eq!(value["elapsed_secs"], 0.5);
        assert!(value.get("duration").is_none());
    }
}
