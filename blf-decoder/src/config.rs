//! Decoder configuration types
//!
//! This module defines the small set of knobs the decoder library exposes.
//! Output formatting and error-frame policy belong to the application layer.

use serde::{Deserialize, Serialize};

/// What to do with a log container whose compression method is unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPolicy {
    /// Stop decoding with `UnsupportedCompression`
    #[default]
    Abort,
    /// Log a warning and continue with the next container
    Skip,
}

/// Configuration for the decoder library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Policy for containers with an unknown compression method
    #[serde(default)]
    pub unsupported_compression: CompressionPolicy,

    /// Treat a timestamp that goes backwards within a container as a decode
    /// error. When disabled the record is kept and a warning is logged.
    #[serde(default = "default_strict_timestamps")]
    pub strict_timestamps: bool,

    /// Optional: only emit records from these (zero-based) channels
    #[serde(default)]
    pub channel_filter: Option<Vec<u16>>,

    /// Optional: only emit records with these arbitration IDs. Error frames
    /// carry no ID and always pass.
    #[serde(default)]
    pub id_filter: Option<Vec<u32>>,
}

fn default_strict_timestamps() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            unsupported_compression: CompressionPolicy::default(),
            strict_timestamps: default_strict_timestamps(),
            channel_filter: None,
            id_filter: None,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the unsupported-compression policy
    pub fn with_compression_policy(mut self, policy: CompressionPolicy) -> Self {
        self.unsupported_compression = policy;
        self
    }

    /// Builder method: enable or relax strict timestamp ordering
    pub fn with_strict_timestamps(mut self, enabled: bool) -> Self {
        self.strict_timestamps = enabled;
        self
    }

    /// Builder method: set channel filter
    pub fn with_channel_filter(mut self, channels: Vec<u16>) -> Self {
        self.channel_filter = Some(channels);
        self
    }

    /// Builder method: set arbitration ID filter
    pub fn with_id_filter(mut self, ids: Vec<u32>) -> Self {
        self.id_filter = Some(ids);
        self
    }

    /// Check if a channel should be processed
    pub fn should_process_channel(&self, channel: u16) -> bool {
        match &self.channel_filter {
            Some(channels) => channels.contains(&channel),
            None => true,
        }
    }

    /// Check if an arbitration ID should be processed
    pub fn should_process_id(&self, id: Option<u32>) -> bool {
        match (&self.id_filter, id) {
            (Some(ids), Some(id)) => ids.contains(&id),
            _ => true,
        }
    }

    /// Check if a record should be emitted based on filters
    pub fn should_process_record(&self, channel: u16, id: Option<u32>) -> bool {
        self.should_process_channel(channel) && self.should_process_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_compression_policy(CompressionPolicy::Skip)
            .with_strict_timestamps(false)
            .with_channel_filter(vec![0, 1])
            .with_id_filter(vec![0x123]);

        assert_eq!(config.unsupported_compression, CompressionPolicy::Skip);
        assert!(!config.strict_timestamps);
        assert_eq!(config.channel_filter, Some(vec![0, 1]));
        assert_eq!(config.id_filter, Some(vec![0x123]));
    }

    #[test]
    fn test_filter_logic() {
        let config = DecoderConfig::new()
            .with_channel_filter(vec![0, 1])
            .with_id_filter(vec![0x123, 0x456]);

        assert!(config.should_process_record(0, Some(0x123)));
        assert!(config.should_process_record(1, Some(0x456)));
        assert!(!config.should_process_record(2, Some(0x123))); // Wrong channel
        assert!(!config.should_process_record(0, Some(0x789))); // Wrong ID
        assert!(config.should_process_record(1, None)); // Error frame
    }

    #[test]
    fn test_no_filters() {
        let config = DecoderConfig::new();
        assert_eq!(config.unsupported_compression, CompressionPolicy::Abort);
        assert!(config.strict_timestamps);
        assert!(config.should_process_record(0, Some(0x123)));
        assert!(config.should_process_record(99, Some(0x1FFF_FFFF)));
    }
}
