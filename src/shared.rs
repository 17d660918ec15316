use std::{fmt::Debug, sync::Arc};

use bytes::Bytes;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{BitFilter, BitRead, BitWrite, codec::DecodeErr};

/// A cloneable, thread-safe handle to a single [`BitFilter`].
///
/// Every mutation (`set`, `delete`, `decode_from`) takes the write lock, and
/// every read takes the read lock, so each call observes a consistent filter.
/// Use [`SharedBitFilter::write`] to batch several mutations under one lock.
///
/// # Examples
///
/// ```
/// use bitfilter_rs::{BitFilter, SharedBitFilter};
///
/// let shared = SharedBitFilter::new(BitFilter::new(64));
/// let handle = shared.clone();
/// std::thread::spawn(move || handle.set(100)).join().unwrap();
///
/// assert!(shared.contains(100));
/// assert_eq!(shared.capacity(), 104);
/// ```
#[derive(Clone, Default)]
pub struct SharedBitFilter {
    inner: Arc<RwLock<BitFilter>>,
}

impl SharedBitFilter {
    pub fn new(filter: BitFilter) -> Self {
        Self { inner: Arc::new(RwLock::new(filter)) }
    }

    pub fn from_bytes(data: impl AsRef<[u8]>) -> Result<Self, DecodeErr> {
        Ok(Self::new(BitFilter::from_bytes(data)?))
    }

    #[inline]
    pub fn set(&self, bit: usize) {
        self.inner.write().set(bit);
    }

    #[inline]
    pub fn delete(&self, bit: usize) {
        self.inner.write().delete(bit);
    }

    #[inline]
    pub fn get(&self, bit: usize) -> u8 {
        self.inner.read().get(bit)
    }

    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        self.inner.read().contains(bit)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    /// Collects the set bits while holding the read lock for the whole scan.
    pub fn set_bits(&self) -> Vec<usize> {
        self.inner.read().set_bits()
    }

    pub fn encode_to_bytes(&self) -> Bytes {
        self.inner.read().encode_to_bytes()
    }

    /// Replaces the shared filter's storage. Decoding happens under the write
    /// lock, and the filter is untouched if it fails.
    pub fn decode_from(&self, data: impl AsRef<[u8]>) -> Result<(), DecodeErr> {
        self.inner.write().decode_from(data)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, BitFilter> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, BitFilter> {
        self.inner.write()
    }

    /// Returns the filter if this is the only handle left, otherwise returns
    /// the handle back.
    pub fn try_into_inner(self) -> Result<BitFilter, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<BitFilter> for SharedBitFilter {
    fn from(filter: BitFilter) -> Self {
        Self::new(filter)
    }
}

impl Debug for SharedBitFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedBitFilter")
            .field(&*self.inner.read())
            .finish()
    }
}
