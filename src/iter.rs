use std::iter::FusedIterator;

/// Iterates over the indices of set bits in LSB-first byte storage, eight
/// bytes at a time. Zero words are skipped without inspecting their bits.
#[derive(Clone)]
#[must_use]
pub(crate) struct SetBits<'a> {
    bytes: &'a [u8],
    // byte offset of the next word to load
    offset: usize,
    // bit index of the lowest bit in `word`
    base: usize,
    word: u64,
}

impl<'a> SetBits<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0, base: 0, word: 0 }
    }

    /// Loads the next non-zero word. Returns false once storage is exhausted.
    fn load(&mut self) -> bool {
        while self.offset < self.bytes.len() {
            let end = (self.offset + 8).min(self.bytes.len());
            let mut word = [0u8; 8];
            word[..end - self.offset].copy_from_slice(&self.bytes[self.offset..end]);

            self.base = self.offset * 8;
            self.offset = end;
            self.word = u64::from_le_bytes(word);
            if self.word != 0 {
                return true;
            }
        }
        false
    }
}

impl Iterator for SetBits<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.word == 0 && !self.load() {
            return None;
        }
        let bit = self.word.trailing_zeros() as usize;
        // clear the lowest set bit
        self.word &= self.word - 1;
        Some(self.base + bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = self.word.count_ones() as usize;
        let rest = (self.bytes.len() - self.offset) * 8;
        (pending, Some(pending + rest))
    }
}

impl FusedIterator for SetBits<'_> {}
