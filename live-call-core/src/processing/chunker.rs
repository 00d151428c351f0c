/// Re-frames arbitrarily sized capture buffers into fixed-size chunks.
///
/// Capture devices deliver whatever period size they negotiated; the
/// outbound audio path wants every chunk to hold exactly `chunk_size`
/// frames. Samples are buffered until a full chunk is available. Nothing is
/// ever dropped here; a partial tail waits for the next buffer.
#[derive(Debug)]
pub struct SampleChunker {
    pending: Vec<f32>,
    chunk_size: usize,
}

impl SampleChunker {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            pending: Vec::with_capacity(chunk_size),
            chunk_size,
        }
    }

    /// Append samples and return every chunk completed by them, oldest first.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut ready = Vec::new();
        let mut rest = samples;

        while !rest.is_empty() {
            let room = self.chunk_size - self.pending.len();
            let take = room.min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.pending.len() == self.chunk_size {
                let full = std::mem::replace(&mut self.pending, Vec::with_capacity(self.chunk_size));
                ready.push(full);
            }
        }
        ready
    }

    /// Number of samples waiting for a full chunk.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Discard any partial chunk.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_chunk_passes_through() {
        let mut chunker = SampleChunker::new(4);
        let chunks = chunker.push(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(chunks, vec![vec![1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(chunker.pending(), 0);
    }

    #[test]
    fn small_buffers_accumulate() {
        let mut chunker = SampleChunker::new(4);
        assert!(chunker.push(&[1.0, 2.0]).is_empty());
        assert!(chunker.push(&[3.0]).is_empty());
        assert_eq!(chunker.pending(), 3);

        let chunks = chunker.push(&[4.0, 5.0]);
        assert_eq!(chunks, vec![vec![1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn large_buffer_splits_in_order() {
        let mut chunker = SampleChunker::new(2);
        let chunks = chunker.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(chunks, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn reset_drops_partial_chunk() {
        let mut chunker = SampleChunker::new(3);
        chunker.push(&[1.0]);
        chunker.reset();
        assert_eq!(chunker.pending(), 0);
        assert_eq!(chunker.push(&[2.0, 3.0, 4.0]), vec![vec![2.0, 3.0, 4.0]]);
    }

    #[test]
    fn zero_size_is_treated_as_one() {
        let mut chunker = SampleChunker::new(0);
        assert_eq!(chunker.chunk_size(), 1);
        assert_eq!(chunker.push(&[1.0, 2.0]).len(), 2);
    }

    #[test]
    fn empty_push_is_noop() {
        let mut chunker = SampleChunker::new(4);
        assert!(chunker.push(&[]).is_empty());
        assert_eq!(chunker.pending(), 0);
    }
}
