//! Random display names for nodes that did not pick a usable one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// ALIAS_PREFIX starts every generated alias
pub const ALIAS_PREFIX: &str = "anonymous_";

/// ANIMALS is the fixed list aliases are drawn from
pub const ANIMALS: [&str; 19] = [
    "cat", "bat", "bison", "dolphin", "eagle", "pony", "ape", "lobster", "monkey", "dog", "parrot", "cow", "sheep",
    "deer", "duck", "rabbit", "spider", "wolf", "turkey",
];

/// AliasGenerator owns one random source for the life of the process (or the test).
///
/// Build it once and hand it to whoever needs aliases; do not build one per call.
pub struct AliasGenerator<R: Rng = StdRng> {
    rng: R,
}

impl AliasGenerator<StdRng> {
    /// from_entropy seeds the generator from the OS
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// with_seed makes the sequence of aliases reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl<R: Rng> AliasGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// next_alias returns "anonymous_<animal>", every animal equally likely
    pub fn next_alias(&mut self) -> String {
        make_alias(&mut self.rng)
    }
}

fn make_alias<R: Rng + ?Sized>(rng: &mut R) -> String {
    let animal = ANIMALS[rng.gen_range(0..ANIMALS.len())];
    format!("{}{}", ALIAS_PREFIX, animal)
}

/// generate_alias draws from the thread-local generator, which is seeded from OS entropy once and never reseeded
pub fn generate_alias() -> String {
    make_alias(&mut rand::thread_rng())
}

/// is_alias reports whether `name` is something generate_alias could have returned
pub fn is_alias(name: &str) -> bool {
    name.strip_prefix(ALIAS_PREFIX)
        .map(|animal| ANIMALS.contains(&animal))
        .unwrap_or(false)
}

/* ------------------------------------------------------------------------- */

// TESTS
