//! Thread-local seeded randomness.
//!
//! Each thread owns one generator. [`SeedScope`] swaps in a generator seeded
//! from a fixed value and puts the previous one back when dropped, on every
//! exit path including unwinding. Scopes nest: each restores exactly the
//! state that was live when it was entered. Because the generator is
//! thread-local, concurrent scopes on different threads never observe each
//! other.
//!
//! Engine implementations draw numbers through [`with_rng`].

use std::cell::RefCell;
use std::marker::PhantomData;

use rand::SeedableRng;
use rand::rngs::StdRng;

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::from_os_rng());
}

/// Run `f` with this thread's generator.
///
/// `f` must not call `with_rng` again or enter a [`SeedScope`].
pub fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

/// Guard that reseeds this thread's generator for its lifetime.
///
/// The guard is `!Send`: it must be dropped on the thread that created it.
#[must_use = "the seed is only in effect while the scope is alive"]
pub struct SeedScope {
    previous: Option<StdRng>,
    seed: u64,
    _not_send: PhantomData<*const ()>,
}

impl SeedScope {
    /// Snapshot the current generator and replace it with one seeded from `seed`.
    pub fn enter(seed: u64) -> Self {
        let previous = RNG.with(|cell| cell.replace(StdRng::seed_from_u64(seed)));
        tracing::trace!(seed, "Entered seed scope");
        Self {
            previous: Some(previous),
            seed,
            _not_send: PhantomData,
        }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl Drop for SeedScope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            RNG.with(|cell| *cell.borrow_mut() = previous);
        }
    }
}
