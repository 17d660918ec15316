use itertools::{Itertools, assert_equal};
use rand::{SeedableRng, seq::index};

use crate::{BitFilter, BitRead, BitWrite};

/// Create a filter pre-sized to `initial` bits with the given bits set.
pub fn mkfilter(initial: usize, bits: impl IntoIterator<Item = usize>) -> BitFilter {
    let mut filter = BitFilter::new(initial);
    filter.extend(bits);
    filter
}

pub struct SetGen {
    rng: rand::rngs::StdRng,
}

impl SetGen {
    pub fn new(seed: u64) -> Self {
        let rng = rand::rngs::StdRng::seed_from_u64(seed);
        Self { rng }
    }

    /// `len` distinct bit indices below `max`, sorted.
    #[track_caller]
    pub fn random_max(&mut self, len: usize, max: usize) -> Vec<usize> {
        assert!(len <= max, "cannot draw {len} distinct values below {max}");
        index::sample(&mut self.rng, max, len)
            .into_iter()
            .sorted()
            .collect()
    }

    /// `runs` runs of consecutive bits, each `run_len` long, spaced `stride`
    /// apart starting at zero.
    pub fn runs(&mut self, runs: usize, run_len: usize, stride: usize) -> Vec<usize> {
        assert!(run_len <= stride, "runs must not overlap");
        (0..runs)
            .flat_map(|r| (r * stride)..(r * stride + run_len))
            .collect()
    }
}

/// Checks every read operation of `reader` against the sorted, deduplicated
/// set of bits it is expected to hold.
#[track_caller]
pub fn test_bit_read<R: BitRead>(reader: &R, expected: &[usize]) {
    assert_eq!(reader.cardinality(), expected.len(), "cardinality");
    assert_eq!(reader.is_empty(), expected.is_empty(), "is_empty");
    assert_eq!(reader.capacity() % 8, 0, "capacity must be whole bytes");

    for &bit in expected {
        assert!(bit < reader.capacity(), "{bit} is beyond capacity");
        assert_eq!(reader.get(bit), 1, "get({bit})");
        assert!(reader.contains(bit), "contains({bit})");
    }

    // the neighbours of every member are members only if expected says so
    for &bit in expected {
        for probe in [bit.wrapping_sub(1), bit + 1] {
            let member = expected.binary_search(&probe).is_ok();
            assert_eq!(reader.contains(probe), member, "contains({probe})");
            assert_eq!(reader.get(probe), u8::from(member), "get({probe})");
        }
    }

    let capacity = reader.capacity();
    for probe in [capacity, capacity + 1, capacity + 8, usize::MAX] {
        assert_eq!(reader.get(probe), 0, "get({probe}) beyond capacity");
        assert!(!reader.contains(probe), "contains({probe}) beyond capacity");
    }
    assert_eq!(reader.capacity(), capacity, "reads must not grow");

    assert_equal(reader.iter(), expected.iter().copied());
}

/// Exercises set and delete on `writer`, including bits beyond its capacity.
#[track_caller]
pub fn test_bit_write<W: BitWrite + BitRead>(writer: &mut W) {
    let start = writer.capacity();

    // deleting beyond capacity is a no-op
    writer.delete(start + 100);
    assert_eq!(writer.capacity(), start);

    let beyond = start + 17;
    writer.set(beyond);
    assert!(writer.contains(beyond));
    assert!(writer.capacity() > beyond);
    let grown = writer.capacity();

    // setting twice changes nothing
    writer.set(beyond);
    assert_eq!(writer.capacity(), grown);
    assert_eq!(writer.cardinality(), 1);

    for bit in (0..grown).step_by(3) {
        writer.set(bit);
    }
    for bit in (0..grown).step_by(6) {
        writer.delete(bit);
        writer.delete(bit);
    }
    assert_eq!(writer.capacity(), grown, "in-range writes must not grow");

    for bit in 0..grown {
        let expected = (bit % 3 == 0 && bit % 6 != 0) || bit == beyond;
        assert_eq!(writer.contains(bit), expected, "bit {bit}");
    }

    for bit in 0..grown {
        writer.delete(bit);
    }
    assert!(writer.is_empty());
    assert_eq!(writer.iter().next(), None);
    assert_eq!(writer.capacity(), grown);
}
