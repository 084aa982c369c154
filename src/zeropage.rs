//! Zero-page allocation (spec §4.H).
//!
//! The C64's zero page (addresses `$00`-`$ff`) is scarce and partly
//! reserved by the KERNAL, so allocation is modeled as a trait rather than
//! baked into the emitter: a downstream driver targeting a different memory
//! map (or a different `%zeropage` mode) can supply its own allocator.
//! `SimpleZeropageAllocator` is the in-crate default, good enough to run the
//! pipeline end to end without an external driver.

/// Allocates zero-page storage for variables the checker/codegen marked
/// `zeropage: true`, plus any compiler-internal temporaries the IR emitter
/// needs. Exhaustion is never fatal: the caller always downgrades it to a
/// `ZeropageDepletedError` warning and falls back to ordinary (non-zero-
/// page) storage for the variable (spec §7).
pub trait ZeropageAllocator {
    /// Reserves `size` contiguous bytes, returning the starting address, or
    /// `None` if no free run of that size remains.
    fn allocate(&mut self, size: u8) -> Option<u8>;

    fn bytes_free(&self) -> u16;
}

/// `%zeropage` compilation modes (spec GLOSSARY), controlling how much of
/// the page the compiler is permitted to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ZeropageMode {
    /// Use only addresses the KERNAL and BASIC leave free.
    Compatible,
    /// Use the full page except a handful of hard-reserved addresses.
    Full,
    /// Don't use the zero page at all, even for compiler temporaries.
    DontUse,
}

impl ZeropageMode {
    fn free_ranges(self) -> &'static [(u8, u8)] {
        match self {
            // A conservative reference set of free ranges under KERNAL/BASIC,
            // not attempting to be address-exact since no downstream linker
            // consumes these values yet.
            ZeropageMode::Compatible => &[(0x02, 0x2f), (0xfb, 0xfe)],
            ZeropageMode::Full => &[(0x02, 0xfe)],
            ZeropageMode::DontUse => &[],
        }
    }
}

/// Simple bump-per-range free-list allocator: tries each free range in
/// order and returns the first stretch of `size` contiguous free bytes.
pub struct SimpleZeropageAllocator {
    free: Vec<(u8, u8)>,
}

impl SimpleZeropageAllocator {
    pub fn new(mode: ZeropageMode) -> Self {
        SimpleZeropageAllocator {
            free: mode.free_ranges().to_vec(),
        }
    }
}

impl ZeropageAllocator for SimpleZeropageAllocator {
    fn allocate(&mut self, size: u8) -> Option<u8> {
        if size == 0 {
            return None;
        }
        for range in self.free.iter_mut() {
            let (start, end) = *range;
            let available = end as u16 - start as u16 + 1;
            if available >= size as u16 {
                let addr = start;
                range.0 = start + size;
                return Some(addr);
            }
        }
        None
    }

    fn bytes_free(&self) -> u16 {
        self.free
            .iter()
            .map(|(start, end)| *end as u16 - *start as u16 + 1)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequentially_within_a_range() {
        let mut alloc = SimpleZeropageAllocator::new(ZeropageMode::Compatible);
        let a = alloc.allocate(2).unwrap();
        let b = alloc.allocate(2).unwrap();
        assert_eq!(b, a + 2);
    }

    #[test]
    fn dont_use_mode_always_fails() {
        let mut alloc = SimpleZeropageAllocator::new(ZeropageMode::DontUse);
        assert!(alloc.allocate(1).is_none());
        assert_eq!(alloc.bytes_free(), 0);
    }

    #[test]
    fn exhaustion_returns_none_without_panicking() {
        let mut alloc = SimpleZeropageAllocator::new(ZeropageMode::Compatible);
        let total = alloc.bytes_free();
        assert!(alloc.allocate(total as u8 + 1).is_none());
    }
}
