//! Processor mask
//!
//! Set of processor indices. Used for thread affinity and for the set of
//! processors owned by a scheduler instance.

use core::fmt;

/// Maximum number of processors a mask can describe
pub const PROCESSOR_MASK_BITS: usize = 64;

/// Processor index
pub type CpuIndex = usize;

/// Processor mask (64 processors max)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProcessorMask(u64);

impl ProcessorMask {
    /// Create empty mask
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mask with processors `0..count`
    pub const fn first_n(count: usize) -> Self {
        if count >= PROCESSOR_MASK_BITS {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Create mask for single processor
    pub const fn single(cpu: CpuIndex) -> Self {
        Self(1 << (cpu & 63))
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Set processor bit
    pub fn set(&mut self, cpu: CpuIndex) {
        self.0 |= 1 << (cpu & 63);
    }

    /// Clear processor bit
    pub fn clear(&mut self, cpu: CpuIndex) {
        self.0 &= !(1 << (cpu & 63));
    }

    pub const fn is_set(&self, cpu: CpuIndex) -> bool {
        cpu < PROCESSOR_MASK_BITS && (self.0 & (1 << cpu)) != 0
    }

    /// Count set processors
    pub const fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Lowest set processor
    pub const fn first(&self) -> Option<CpuIndex> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as CpuIndex)
        }
    }

    pub const fn has_overlap(&self, other: &Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Is every processor of `self` also in `other`?
    pub const fn is_subset_of(&self, other: &Self) -> bool {
        (self.0 & !other.0) == 0
    }

    pub const fn and(&self, other: &Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn or(&self, other: &Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Processors of `self` not in `other`
    pub const fn and_not(&self, other: &Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn iter(&self) -> ProcessorMaskIter {
        ProcessorMaskIter(self.0)
    }
}

impl fmt::Debug for ProcessorMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessorMask({:#x})", self.0)
    }
}

impl FromIterator<CpuIndex> for ProcessorMask {
    fn from_iter<I: IntoIterator<Item = CpuIndex>>(iter: I) -> Self {
        let mut mask = Self::empty();
        for cpu in iter {
            mask.set(cpu);
        }
        mask
    }
}

/// Iterator over set processors, lowest first
pub struct ProcessorMaskIter(u64);

impl Iterator for ProcessorMaskIter {
    type Item = CpuIndex;

    fn next(&mut self) -> Option<CpuIndex> {
        if self.0 == 0 {
            return None;
        }
        let cpu = self.0.trailing_zeros() as CpuIndex;
        self.0 &= self.0 - 1;
        Some(cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_set_clear_overlap() {
        let mut mask = ProcessorMask::empty();
        mask.set(0);
        mask.set(3);
        assert!(mask.is_set(3));
        assert_eq!(mask.count(), 2);
        mask.clear(0);
        assert_eq!(mask.first(), Some(3));
        assert!(mask.has_overlap(&ProcessorMask::first_n(4)));
        assert!(!mask.has_overlap(&ProcessorMask::first_n(3)));
        assert!(!mask.is_set(200));
    }

    #[test]
    fn test_iter_and_collect() {
        let mask: ProcessorMask = [5, 1, 9].into_iter().collect();
        assert_eq!(mask.iter().collect::<Vec<_>>(), [1, 5, 9]);
        assert_eq!(ProcessorMask::first_n(64).count(), 64);
        assert!(ProcessorMask::single(5).is_subset_of(&mask));
        assert_eq!(mask.and_not(&ProcessorMask::single(5)).count(), 2);
    }
}
