pub trait BitRead {
    /// the number of addressable bits without growth. Always a multiple of 8.
    fn capacity(&self) -> usize;

    /// returns 1 if the bit is set and 0 otherwise. Bits at or beyond
    /// `capacity` read as 0.
    fn get(&self, bit: usize) -> u8;

    /// returns true if the bit is set
    #[inline]
    fn contains(&self, bit: usize) -> bool {
        self.get(bit) == 1
    }

    /// returns the number of set bits
    fn cardinality(&self) -> usize;

    /// returns true if no bits are set
    #[inline]
    fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    /// returns an iterator over the indices of all set bits in ascending order.
    ///
    /// This scans the whole storage, so the cost grows with `capacity` rather
    /// than with the number of set bits.
    fn iter(&self) -> impl Iterator<Item = usize>;
}

pub trait BitWrite {
    /// Sets the bit, growing storage if the bit lies beyond `capacity`.
    fn set(&mut self, bit: usize);

    /// Clears the bit. Bits beyond `capacity` are already clear, so this never
    /// grows storage.
    fn delete(&mut self, bit: usize);
}
