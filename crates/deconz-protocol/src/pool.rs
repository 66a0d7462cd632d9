//! Object pools (C3)
//!
//! Fixed-size reusable slot arrays for hot protocol objects. Grounded on
//! `ApsDataRequestPrivate::PoolSize = 16` (examples/original_source/aps.cpp)
//! and the `ZclMemory` pool singleton (deconz/zcl.h) — both pool APS requests
//! and ZCL frames/attributes from a bounded array and only fall back to the
//! heap once the array is exhausted.
//!
//! Not thread-safe by contract: SPEC_FULL.md §5 mandates a single-threaded
//! cooperative model, so this type carries no internal synchronization.

use tracing::debug;

pub const APS_POOL_SIZE: usize = 16;
pub const ZCL_FRAME_POOL_SIZE: usize = 16;
pub const ZCL_ATTRIBUTE_POOL_SIZE: usize = 64;

/// Fixed-size pool of `N` slots for poolable type `T`.
///
/// Allocation scans for an *occupied* slot (matching the reference's "take
/// whichever live instance the pool already parked" reuse pattern) and hands
/// the value in that slot back to the caller with a fresh one in its place;
/// when no slot holds a value, a heap-allocated one is handed out instead.
/// Deallocation scans for the first *empty* slot and stores into it, falling
/// back to simply dropping the value (freeing it) when the pool is full.
pub struct Pool<T, const N: usize> {
    name: &'static str,
    slots: [Option<T>; N],
}

impl<T, const N: usize> Pool<T, N> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Hand out a value, preferring a slot the pool already holds.
    pub fn acquire(&mut self, default: impl FnOnce() -> T) -> T {
        for slot in &mut self.slots {
            if let Some(value) = slot.take() {
                return value;
            }
        }
        debug!(pool = self.name, "pool exhausted, falling back to heap allocation");
        default()
    }

    /// Return a value to the pool, or drop it (freeing on the heap) if full.
    pub fn release(&mut self, value: T) {
        for slot in &mut self.slots {
            if slot.is_none() {
                *slot = Some(value);
                return;
            }
        }
        debug!(pool = self.name, "pool full, releasing directly to heap");
        drop(value);
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Release all occupied slots, as happens at process teardown.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}
