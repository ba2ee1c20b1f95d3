// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

use rand::{rngs::SmallRng, SeedableRng};

/// The one RNG the engine draws from, owned by `Context` rather than
/// reached for as a thread-local. Every `Distribution::sample()` call and
/// `sample_plan`'s uniform child pick consumes from this RNG, so seeding it
/// makes a `Context`'s behavior fully deterministic given deterministic
/// callbacks.
pub(crate) enum EngineRng {
    Seeded(SmallRng),
    Unseeded,
}

impl EngineRng {
    pub(crate) fn unseeded() -> Self {
        EngineRng::Unseeded
    }

    pub(crate) fn seed(seed: u64) -> Self {
        EngineRng::Seeded(SmallRng::seed_from_u64(seed))
    }

    /// Returns the underlying `SmallRng`, lazily seeding from OS entropy on
    /// first use if `seed` was never called.
    pub(crate) fn get(&mut self) -> &mut SmallRng {
        if matches!(self, EngineRng::Unseeded) {
            *self = EngineRng::Seeded(SmallRng::from_os_rng());
        }
        match self {
            EngineRng::Seeded(rng) => rng,
            EngineRng::Unseeded => unreachable!("just seeded above"),
        }
    }
}
