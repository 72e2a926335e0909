/// Where the bytes of a descriptor live. Sources are resolved to a slice on every read, so the
/// cursor never holds a borrow across callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlobSource {
    /// A constant table.
    Rom(&'static [u8]),
    /// The catalog's scratch buffer, holding the most recently assembled descriptor.
    Scratch,
    /// An entry of the configuration store, by index.
    Store(u16),
}

/// Read-only view of a descriptor: a source and how many of its bytes to serve.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DescriptorBlob {
    pub source: BlobSource,
    pub len: usize,
}

impl DescriptorBlob {
    pub fn new(source: BlobSource, len: usize) -> Self { DescriptorBlob { source, len } }

    /// Serve at most `limit` bytes (the host's wLength).
    pub fn truncated(self, limit: usize) -> Self { DescriptorBlob { source: self.source, len: self.len.min(limit) } }
}

/// Progress through a descriptor that the host reads one chunk at a time.
///
/// Only one transfer is tracked; arming again abandons whatever was in flight. `remaining` only ever
/// counts down, and a retired cursor answers every read with zero bytes.
#[derive(Debug)]
pub struct PagedTransferCursor {
    source: BlobSource,
    offset: usize,
    remaining: usize,
}

impl PagedTransferCursor {
    pub const fn new() -> Self { PagedTransferCursor { source: BlobSource::Scratch, offset: 0, remaining: 0 } }

    pub fn arm(&mut self, blob: DescriptorBlob) {
        if self.remaining != 0 {
            log::debug!("abandoning transfer with {} bytes left", self.remaining);
        }
        self.source = blob.source;
        self.offset = 0;
        self.remaining = blob.len;
    }

    pub fn retire(&mut self) {
        self.offset = 0;
        self.remaining = 0;
    }

    pub fn source(&self) -> BlobSource { self.source }

    pub fn remaining(&self) -> usize { self.remaining }

    pub fn is_active(&self) -> bool { self.remaining != 0 }

    /// Copies the next chunk of `bytes`, the resolved source, into `dest`. The chunk is
    /// `min(dest.len(), remaining)` long, and never reads past the end of `bytes`: a source that
    /// turns out shorter than armed retires the cursor early. An empty `dest` leaves it armed.
    pub fn read(&mut self, bytes: &[u8], dest: &mut [u8]) -> usize {
        if self.remaining == 0 {
            return 0;
        }
        let available = bytes.len().saturating_sub(self.offset);
        if available == 0 {
            log::warn!("descriptor source ended {} bytes early", self.remaining);
            self.retire();
            return 0;
        }
        let n = dest.len().min(self.remaining).min(available);
        dest[..n].copy_from_slice(&bytes[self.offset..self.offset + n]);
        self.offset += n;
        self.remaining -= n;
        n
    }
}

impl Default for PagedTransferCursor {
    fn default() -> Self { Self::new() }
}
