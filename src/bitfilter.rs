use std::fmt::Debug;

use bitvec::{order::Lsb0, vec::BitVec};
use bytes::{BufMut, Bytes};
use tracing::{debug, trace, warn};

use crate::{
    codec::{Codec, DecodeErr, ZlibCodec},
    config::{BitFilterConfig, ConfigErr, DEFAULT_INITIAL_BITS, GrowthPolicy},
    iter::SetBits,
    traits::{BitRead, BitWrite},
};

/// A growable set of bits backed by a byte array.
///
/// Bit `i` lives in byte `i / 8` at bit offset `i % 8`, least significant bit
/// first. Setting a bit beyond [`BitRead::capacity`] grows storage to fit it;
/// reading or deleting beyond it never grows anything.
///
/// The serialized form is the zlib stream of the raw storage bytes, with no
/// header of its own.
///
/// # Examples
///
/// ```
/// use bitfilter_rs::{BitFilter, BitRead, BitWrite};
///
/// let mut filter = BitFilter::new(16);
/// assert_eq!(filter.capacity(), 16);
///
/// // writing past the end grows storage by whole bytes
/// filter.set(20);
/// assert_eq!(filter.capacity(), 24);
/// assert_eq!(filter.get(20), 1);
/// assert!(!filter.contains(19));
///
/// let bytes = filter.encode_to_bytes();
/// let decoded = BitFilter::from_bytes(&bytes).unwrap();
/// assert_eq!(decoded, filter);
/// ```
#[derive(Clone)]
pub struct BitFilter {
    bits: BitVec<u8, Lsb0>,
    growth: GrowthPolicy,
    codec: ZlibCodec,
}

static_assertions::assert_impl_all!(BitFilter: Send, Sync);

impl BitFilter {
    /// Creates a filter with room for `bits` bits, rounded up to a whole byte.
    /// All bits start cleared.
    pub fn new(bits: usize) -> Self {
        Self::from_raw(Vec::new(), &BitFilterConfig::default())
            .with_zeroed_bytes(bits.div_ceil(8))
    }

    /// Creates a filter sized, grown and encoded according to `config`.
    pub fn with_config(config: &BitFilterConfig) -> Result<Self, ConfigErr> {
        config.validate()?;
        let bytes = config.initial_bits.div_ceil(8);
        Ok(Self::from_raw(Vec::new(), config).with_zeroed_bytes(bytes))
    }

    /// Reconstructs a filter from the output of [`BitFilter::encode_to_bytes`].
    ///
    /// The decompressed bytes become storage as-is, so the decoded filter has
    /// exactly the capacity of the one that was encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitfilter_rs::{BitFilter, BitWrite};
    ///
    /// let mut filter = BitFilter::new(8);
    /// filter.set(3);
    /// let bytes = filter.encode_to_bytes();
    /// assert_eq!(BitFilter::from_bytes(&bytes).unwrap(), filter);
    ///
    /// assert!(BitFilter::from_bytes(b"not-valid-compressed-data").is_err());
    /// ```
    pub fn from_bytes(data: impl AsRef<[u8]>) -> Result<Self, DecodeErr> {
        Self::from_bytes_with_config(data, &BitFilterConfig::default())
    }

    /// Like [`BitFilter::from_bytes`], but the decoded filter takes its growth
    /// policy and compression level from `config`. `config.initial_bits` is
    /// ignored since the encoded storage determines the capacity.
    pub fn from_bytes_with_config(
        data: impl AsRef<[u8]>,
        config: &BitFilterConfig,
    ) -> Result<Self, DecodeErr> {
        let raw = decode_logged(&config.codec(), data.as_ref())?;
        Ok(Self::from_raw(raw, config))
    }

    /// Decodes a filter with a caller supplied codec.
    pub fn decode_with<C: Codec>(codec: &C, data: impl AsRef<[u8]>) -> Result<Self, DecodeErr> {
        let raw = decode_logged(codec, data.as_ref())?;
        Ok(Self::from_raw(raw, &BitFilterConfig::default()))
    }

    /// Replaces storage with the contents of an encoded filter.
    ///
    /// On error the filter is left untouched.
    pub fn decode_from(&mut self, data: impl AsRef<[u8]>) -> Result<(), DecodeErr> {
        let raw = decode_logged(&self.codec, data.as_ref())?;
        self.bits = BitVec::from_vec(raw);
        Ok(())
    }

    /// Encodes the raw storage bytes as a zlib stream.
    pub fn encode_to_bytes(&self) -> Bytes {
        self.codec.encode_to_bytes(self.as_bytes())
    }

    /// Encodes the raw storage bytes with a caller supplied codec into `out`.
    pub fn encode_with<C: Codec, B: BufMut>(&self, codec: &C, out: &mut B) {
        codec.encode(self.as_bytes(), out);
    }

    /// The length of storage in bytes, i.e. `capacity / 8`.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.bits.as_raw_slice().len()
    }

    /// The raw storage: byte `k` holds bits `8k..8k+8`, least significant bit
    /// first.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Collects the indices of every set bit in ascending order.
    ///
    /// This touches all of storage. Prefer [`BitRead::iter`] when the result
    /// does not need to be materialized.
    pub fn set_bits(&self) -> Vec<usize> {
        self.iter().collect()
    }

    #[inline]
    pub fn growth(&self) -> GrowthPolicy {
        self.growth
    }

    fn from_raw(raw: Vec<u8>, config: &BitFilterConfig) -> Self {
        Self {
            bits: BitVec::from_vec(raw),
            growth: config.growth,
            codec: config.codec(),
        }
    }

    fn with_zeroed_bytes(mut self, bytes: usize) -> Self {
        self.bits.resize(bytes * 8, false);
        self
    }

    #[cold]
    fn grow_to_fit(&mut self, bit: usize) {
        let needed = bit / 8 + 1;
        let bytes = self.growth.grow(self.byte_len(), needed);
        trace!(
            from = self.capacity(),
            to = bytes * 8,
            policy = ?self.growth,
            "growing bit filter"
        );
        self.bits.resize(bytes * 8, false);
    }
}

fn decode_logged<C: Codec>(codec: &C, data: &[u8]) -> Result<Vec<u8>, DecodeErr> {
    match codec.decode(data) {
        Ok(raw) => {
            debug!(encoded = data.len(), bytes = raw.len(), "decoded bit filter");
            Ok(raw)
        }
        Err(err) => {
            warn!(encoded = data.len(), %err, "failed to decode bit filter");
            Err(err)
        }
    }
}

impl Default for BitFilter {
    /// A filter pre-sized to 10000 bits.
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_BITS)
    }
}

impl Debug for BitFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitFilter")
            .field("capacity", &self.capacity())
            .field("bytes", &self.byte_len())
            .field("store", &std::any::type_name::<u8>())
            .finish()
    }
}

impl PartialEq for BitFilter {
    /// Two filters are equal when their storage is byte-for-byte equal.
    /// Filters holding the same bits at different capacities are not equal.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for BitFilter {}

impl BitRead for BitFilter {
    /// Returns the number of bits addressable without growth.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitfilter_rs::{BitFilter, BitRead};
    ///
    /// assert_eq!(BitFilter::new(0).capacity(), 0);
    /// assert_eq!(BitFilter::new(1).capacity(), 8);
    /// assert_eq!(BitFilter::default().capacity(), 10_000);
    /// ```
    #[inline]
    fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Returns 1 if the bit is set and 0 otherwise, including for bits beyond
    /// the capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitfilter_rs::{BitFilter, BitRead, BitWrite};
    ///
    /// let mut filter = BitFilter::new(8);
    /// filter.set(5);
    /// assert_eq!(filter.get(5), 1);
    /// assert_eq!(filter.get(4), 0);
    /// assert_eq!(filter.get(1_000_000), 0);
    /// assert_eq!(filter.capacity(), 8);
    /// ```
    #[inline]
    fn get(&self, bit: usize) -> u8 {
        self.bits.get(bit).map_or(0, |b| u8::from(*b))
    }

    #[inline]
    fn cardinality(&self) -> usize {
        self.bits.count_ones()
    }

    /// Returns the indices of all set bits in ascending order.
    ///
    /// Storage is scanned a 64-bit word at a time and zero words are skipped,
    /// but the cost is still proportional to `capacity`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitfilter_rs::{BitFilter, BitRead, BitWrite};
    ///
    /// let filter: BitFilter = [300, 7, 64].into_iter().collect();
    /// let bits: Vec<usize> = filter.iter().collect();
    /// assert_eq!(bits, vec![7, 64, 300]);
    /// ```
    #[inline]
    fn iter(&self) -> impl Iterator<Item = usize> {
        SetBits::new(self.as_bytes())
    }
}

impl BitWrite for BitFilter {
    /// Sets the bit, growing storage first if `bit >= capacity`.
    ///
    /// # Panics
    ///
    /// Panics if the required storage cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitfilter_rs::{BitFilter, BitRead, BitWrite};
    ///
    /// let mut filter = BitFilter::new(0);
    /// filter.set(9);
    /// assert_eq!(filter.capacity(), 16);
    /// assert!(filter.contains(9));
    /// ```
    #[inline]
    fn set(&mut self, bit: usize) {
        if bit >= self.capacity() {
            self.grow_to_fit(bit);
        }
        self.bits.set(bit, true);
    }

    /// Clears the bit if it is within the capacity. Never grows storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitfilter_rs::{BitFilter, BitRead, BitWrite};
    ///
    /// let mut filter = BitFilter::new(8);
    /// filter.set(2);
    /// filter.delete(2);
    /// assert!(!filter.contains(2));
    ///
    /// filter.delete(100);
    /// assert_eq!(filter.capacity(), 8);
    /// ```
    #[inline]
    fn delete(&mut self, bit: usize) {
        if let Some(mut slot) = self.bits.get_mut(bit) {
            *slot = false;
        }
    }
}

impl FromIterator<usize> for BitFilter {
    /// Builds a filter just large enough for the given bits.
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut filter = Self::new(0);
        filter.extend(iter);
        filter
    }
}

impl Extend<usize> for BitFilter {
    fn extend<T: IntoIterator<Item = usize>>(&mut self, iter: T) {
        for bit in iter {
            self.set(bit);
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use itertools::{Itertools, assert_equal};
    use proptest::{
        collection::{hash_set, vec},
        proptest,
    };
    use quickcheck_macros::quickcheck;

    use super::*;
    use crate::testutil::{SetGen, mkfilter, test_bit_read, test_bit_write};

    #[test]
    fn test_sanity() {
        let mut filter = BitFilter::new(16);
        assert_eq!(filter.capacity(), 16);
        assert_eq!(filter.byte_len(), 2);

        filter.set(20);
        assert_eq!(filter.capacity(), 24);
        assert_eq!(filter.get(20), 1);
        assert_eq!(filter.get(19), 0);

        filter.delete(20);
        assert_eq!(filter.get(20), 0);
        assert_eq!(filter.capacity(), 24);

        let buf = filter.encode_to_bytes();
        let decoded = BitFilter::from_bytes(&buf).unwrap();
        assert_eq!(decoded.capacity(), 24);
        for i in 0..24 {
            assert_eq!(decoded.get(i), filter.get(i), "bit {i}");
        }
    }

    #[test]
    fn test_new_rounds_up() {
        assert_eq!(BitFilter::new(0).capacity(), 0);
        assert_eq!(BitFilter::new(1).capacity(), 8);
        assert_eq!(BitFilter::new(8).capacity(), 8);
        assert_eq!(BitFilter::new(9).capacity(), 16);
        assert_eq!(BitFilter::default().byte_len(), 1250);
        assert!(BitFilter::default().is_empty());
    }

    #[test]
    fn test_debug() {
        assert_eq!(
            format!("{:?}", BitFilter::new(16)),
            r#"BitFilter { capacity: 16, bytes: 2, store: "u8" }"#
        );
    }

    #[test]
    fn test_storage_layout() {
        let filter = mkfilter(16, [0, 9, 20]);
        assert_eq!(filter.as_bytes(), &[0x01, 0x02, 0x10]);
    }

    #[test]
    fn test_decode_reference_artifact() {
        // a 16 bit filter with bits 0, 9 and 20 set, as written by an earlier
        // implementation of this format
        let artifact = [120, 156, 99, 100, 18, 0, 0, 0, 26, 0, 20];
        let filter = BitFilter::from_bytes(artifact).unwrap();
        assert_eq!(filter.capacity(), 24);
        assert_eq!(filter.set_bits(), vec![0, 9, 20]);
        assert_eq!(filter, mkfilter(16, [0, 9, 20]));
    }

    #[test]
    fn test_corrupt() {
        assert_matches!(
            BitFilter::from_bytes(b"not-valid-compressed-data"),
            Err(DecodeErr::Invalid(_))
        );

        let mut buf = mkfilter(64, [1, 2, 3]).encode_to_bytes().to_vec();
        buf.truncate(buf.len() - 2);
        assert_matches!(BitFilter::from_bytes(&buf), Err(DecodeErr::Truncated));
    }

    #[test]
    fn test_decode_from_failure_is_atomic() {
        let mut filter = mkfilter(32, [4, 31]);
        let before = filter.clone();
        assert!(filter.decode_from(b"garbage").is_err());
        assert_eq!(filter, before);
        assert_eq!(filter.capacity(), 32);
    }

    #[test]
    fn test_decode_from_replaces_storage() {
        let mut filter = mkfilter(8000, [1, 7999]);
        let other = mkfilter(8, [3]);
        filter.decode_from(other.encode_to_bytes()).unwrap();
        assert_eq!(filter.capacity(), 8);
        assert_eq!(filter.set_bits(), vec![3]);
    }

    #[test]
    fn test_empty_round_trip() {
        let filter = BitFilter::new(0);
        let decoded = BitFilter::from_bytes(filter.encode_to_bytes()).unwrap();
        assert_eq!(decoded.capacity(), 0);
        assert_eq!(decoded.iter().next(), None);
    }

    #[test]
    fn test_doubling_growth() {
        let config = BitFilterConfig::builder()
            .initial_bits(16)
            .growth(GrowthPolicy::Doubling)
            .build()
            .unwrap();
        let mut filter = BitFilter::with_config(&config).unwrap();
        assert_eq!(filter.growth(), GrowthPolicy::Doubling);

        filter.set(16);
        assert_eq!(filter.capacity(), 32);
        filter.set(33);
        assert_eq!(filter.capacity(), 64);
        // far beyond double: grow exactly enough
        filter.set(1000);
        assert_eq!(filter.capacity(), 1008);
        assert_equal(filter.iter(), [16, 33, 1000]);
    }

    #[test]
    fn test_config_travels_with_decode() {
        let config = BitFilterConfig::builder()
            .growth(GrowthPolicy::Doubling)
            .compression_level(9)
            .build()
            .unwrap();
        let buf = mkfilter(16, [1]).encode_to_bytes();
        let mut filter = BitFilter::from_bytes_with_config(&buf, &config).unwrap();
        assert_eq!(filter.capacity(), 16);
        filter.set(16);
        assert_eq!(filter.capacity(), 32);

        // the default config grows exactly
        let mut filter = BitFilter::from_bytes(&buf).unwrap();
        filter.set(16);
        assert_eq!(filter.capacity(), 24);
    }

    #[test]
    fn test_with_config_rejects() {
        let config = BitFilterConfig { compression_level: 12, ..Default::default() };
        assert_matches!(
            BitFilter::with_config(&config),
            Err(ConfigErr::CompressionLevel(12))
        );
    }

    #[test]
    fn test_custom_codec() {
        let filter = mkfilter(64, [5, 60]);
        let codec = ZlibCodec::new(1);
        let mut out = Vec::new();
        filter.encode_with(&codec, &mut out);
        assert_eq!(BitFilter::decode_with(&codec, &out).unwrap(), filter);
    }

    #[test]
    fn test_large_sparse() {
        let mut setgen = SetGen::new(0xDEAD_BEEF);
        let set = setgen.random_max(512, 1 << 24);
        let filter = BitFilter::from_iter(set.iter().copied());
        test_bit_read(&filter, &set);

        let buf = filter.encode_to_bytes();
        // mostly zero bytes compress well
        assert!(buf.len() < filter.byte_len() / 10);
        assert_eq!(BitFilter::from_bytes(buf).unwrap(), filter);
    }

    #[test]
    fn test_write() {
        let mut filter = BitFilter::new(128);
        test_bit_write(&mut filter);

        let mut filter = BitFilter::new(0);
        test_bit_write(&mut filter);
    }

    #[test]
    fn test_equality_is_capacity_sensitive() {
        assert_ne!(mkfilter(8, [1]), mkfilter(16, [1]));
        assert_eq!(mkfilter(8, [1]), mkfilter(0, [1]));
    }

    proptest! {
        #[test]
        fn test_read_proptest(set in hash_set(0usize..16384, 0..512)) {
            let expected = set.iter().copied().sorted().collect_vec();
            test_bit_read(&BitFilter::from_iter(set), &expected);
        }

        #[test]
        fn test_set_get_proptest(initial in 0usize..256, bits in vec(0usize..4096, 0..64)) {
            let mut filter = BitFilter::new(initial);
            for &bit in &bits {
                let before = filter.capacity();
                filter.set(bit);
                assert!(filter.capacity() >= before);
                assert!(filter.capacity() > bit);
                assert_eq!(filter.capacity() % 8, 0);
                assert_eq!(filter.get(bit), 1);
                assert!(filter.contains(bit));
            }
        }

        #[test]
        fn test_delete_proptest(bits in vec(0usize..2048, 0..64), deletes in vec(0usize..4096, 0..64)) {
            let mut filter = BitFilter::from_iter(bits);
            let capacity = filter.capacity();
            for &bit in &deletes {
                filter.delete(bit);
                assert_eq!(filter.get(bit), 0);
                assert_eq!(filter.capacity(), capacity);
            }
        }

        #[test]
        fn test_out_of_range_reads_proptest(initial in 0usize..1024, offset in 0usize..1_000_000) {
            let filter = BitFilter::new(initial);
            let bit = filter.capacity() + offset;
            assert_eq!(filter.get(bit), 0);
            assert!(!filter.contains(bit));
            assert_eq!(filter.capacity(), initial.div_ceil(8) * 8);
        }

        #[test]
        fn test_idempotence_proptest(bits in vec(0usize..1024, 1..32)) {
            let mut once = BitFilter::new(0);
            let mut twice = BitFilter::new(0);
            for &bit in &bits {
                once.set(bit);
                twice.set(bit);
                twice.set(bit);
            }
            assert_eq!(&once, &twice);

            for &bit in bits.iter().step_by(2) {
                once.delete(bit);
                twice.delete(bit);
                twice.delete(bit);
            }
            assert_eq!(once, twice);
        }
    }

    #[quickcheck]
    fn test_round_trip_quickcheck(initial: u16, bits: Vec<u16>) -> bool {
        let filter = mkfilter(initial as usize, bits.into_iter().map(usize::from));
        let decoded = BitFilter::from_bytes(filter.encode_to_bytes()).unwrap();
        decoded.capacity() == filter.capacity()
            && decoded.as_bytes() == filter.as_bytes()
            && decoded.iter().eq(filter.iter())
    }
}
