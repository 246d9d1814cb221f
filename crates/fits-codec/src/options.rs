use tokio_util::sync::CancellationToken;

/// Default cap on the number of blocks a single header may span.
pub const DEFAULT_MAX_HEADER_BLOCKS: usize = 1024;

/// Per-call settings for [`FitsReader`](crate::FitsReader) and
/// [`FitsWriter`](crate::FitsWriter).
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Checked before every block read or write, every flush and every
    /// validator.
    pub cancellation: CancellationToken,
    /// Headers longer than this many blocks fail with
    /// [`Error::MissingEndMarker`](crate::Error::MissingEndMarker).
    pub max_header_blocks: usize,
}

impl CodecOptions {
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_max_header_blocks(mut self, blocks: usize) -> Self {
        self.max_header_blocks = blocks;
        self
    }
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            cancellation: CancellationToken::new(),
            max_header_blocks: DEFAULT_MAX_HEADER_BLOCKS,
        }
    }
}
