//! Invalidation Scanner Module
//!
//! Chunked prefix iteration for backends that cannot delete a key range
//! natively. The scanner pulls `chunk_size` entries at a time and resumes
//! after the last key it has yielded, so callers may delete yielded keys
//! while iterating.

use std::collections::VecDeque;

// == Chunk Source ==
/// A store that can list its keys matching a prefix, a batch at a time.
pub trait ChunkSource {
    /// Returns up to `limit` entries whose key starts with `prefix` and sorts
    /// strictly after `after`, in ascending key order.
    fn next_chunk(&self, prefix: &str, after: Option<&str>, limit: usize)
        -> Vec<(String, Vec<u8>)>;
}

// == Invalidation Scanner ==
/// Lazy, single-pass iterator over `(key, raw value)` pairs under a prefix.
pub struct InvalidationScanner<'a, S: ChunkSource + ?Sized> {
    source: &'a S,
    prefix: String,
    chunk_size: usize,
    cursor: Option<String>,
    buffer: VecDeque<(String, Vec<u8>)>,
    exhausted: bool,
    chunks_fetched: usize,
}

impl<'a, S: ChunkSource + ?Sized> InvalidationScanner<'a, S> {
    pub fn new(source: &'a S, prefix: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            source,
            prefix: prefix.into(),
            chunk_size: chunk_size.max(1),
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
            chunks_fetched: 0,
        }
    }

    /// Number of underlying fetches issued so far.
    pub fn chunks_fetched(&self) -> usize {
        self.chunks_fetched
    }

    fn refill(&mut self) {
        let chunk = self
            .source
            .next_chunk(&self.prefix, self.cursor.as_deref(), self.chunk_size);
        self.chunks_fetched += 1;

        if chunk.len() < self.chunk_size {
            self.exhausted = true;
        }
        if let Some((last, _)) = chunk.last() {
            self.cursor = Some(last.clone());
        }
        self.buffer.extend(chunk);
    }
}

impl<S: ChunkSource + ?Sized> Iterator for InvalidationScanner<'_, S> {
    type Item = (String, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            self.refill();
        }
        self.buffer.pop_front()
    }
}
