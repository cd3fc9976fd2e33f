//! Pluggable fair-coin source for mark assignment.

use rand::Rng;

/// A fair coin used to decide which physical player receives Mark::A
/// when a room fills.
///
/// Injected into the registry so tests can pin the assignment while
/// production uses a real random source.
pub trait FairCoin: Send + Sync {
    /// Flips the coin.
    fn flip(&self) -> bool;
}

/// Thread-local RNG backed coin used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RngCoin;

impl FairCoin for RngCoin {
    fn flip(&self) -> bool {
        rand::thread_rng().r#gen()
    }
}

/// Coin that always lands the same way. Test helper.
#[derive(Debug, Clone, Copy)]
pub struct FixedCoin(pub bool);

impl FairCoin for FixedCoin {
    fn flip(&self) -> bool {
        self.0
    }
}
