//! Stream configuration.

/// Records written between intermediate flushes in bulk operations.
pub const FLUSH_THRESHOLD: usize = 250_000;

/// Encoding and batching settings carried by every [`RecordStream`].
///
/// Streams derived from another stream (subsets, appended fields, sorts)
/// inherit the source's configuration.
///
/// [`RecordStream`]: crate::RecordStream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Lines starting with this byte are skipped by the decoder.
    pub comment: Option<u8>,
    /// Number of records a bulk operation writes before flushing.
    pub flush_threshold: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            comment: Some(b'#'),
            flush_threshold: FLUSH_THRESHOLD,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    /// A threshold of zero is treated as one.
    pub fn with_flush_threshold(mut self, records: usize) -> Self {
        self.flush_threshold = records.max(1);
        self
    }

    pub(crate) fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .comment(self.comment);
        builder
    }

    pub(crate) fn writer_builder(&self) -> csv::WriterBuilder {
        let mut builder = csv::WriterBuilder::new();
        builder.has_headers(false).delimiter(self.delimiter);
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.comment, Some(b'#'));
        assert_eq!(config.flush_threshold, FLUSH_THRESHOLD);
    }

    #[test]
    fn test_builder_methods() {
        let config = StreamConfig::new()
            .with_delimiter(b'|')
            .with_comment(None)
            .with_flush_threshold(10);
        assert_eq!(config.delimiter, b'|');
        assert_eq!(config.comment, None);
        assert_eq!(config.flush_threshold, 10);
    }

    #[test]
    fn test_zero_flush_threshold_clamped() {
        let config = StreamConfig::new().with_flush_threshold(0);
        assert_eq!(config.flush_threshold, 1);
    }
}
