// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Catalog id sets the terms variants filter by.

mod rng;

use std::fmt::{self, Display};

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

pub use self::rng::RngBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(pub String);

impl From<&str> for CatalogId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CatalogId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogIdSample {
    /// The requested size, the pool it was drawn from can be smaller.
    pub size: usize,
    pub ids: Vec<CatalogId>,
}

/// Draws `size` distinct ids, or takes the whole pool if it isn't larger than `size`.
pub fn sample_catalog_ids<R: Rng + ?Sized>(
    pool: &[CatalogId],
    size: usize,
    rng: &mut R,
) -> Vec<CatalogId> {
    if pool.len() <= size {
        return pool.to_vec();
    }
    pool.choose_multiple(rng, size).cloned().collect()
}

/// One sample per size, in ascending size order.
///
/// The smallest sample comes from the serving table, i.e. catalogs which currently have ads,
/// all others from the full catalog table. Each sample is drawn independently.
pub fn draw_samples<R: Rng + ?Sized>(
    serving: &[CatalogId],
    source: &[CatalogId],
    sizes: &[usize],
    rng: &mut R,
) -> Vec<CatalogIdSample> {
    let mut sizes = sizes.to_vec();
    sizes.sort_unstable();
    sizes.dedup();
    sizes
        .into_iter()
        .enumerate()
        .map(|(idx, size)| {
            let pool = if idx == 0 { serving } else { source };
            CatalogIdSample {
                size,
                ids: sample_catalog_ids(pool, size, rng),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn pool(prefix: &str, n: usize) -> Vec<CatalogId> {
        (0..n).map(|i| CatalogId(format!("{prefix}{i}"))).collect()
    }

    #[test]
    fn samples_are_distinct_members_of_the_pool() {
        let pool = pool("c", 500);
        let rng = &mut StdRng::seed_from_u64(42);
        let sample = sample_catalog_ids(&pool, 100, rng);
        assert_eq!(sample.len(), 100);
        let unique = sample.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), 100);
        assert!(sample.iter().all(|id| pool.contains(id)));
    }

    #[test]
    fn small_pools_are_taken_whole() {
        let pool = pool("c", 7);
        let rng = &mut StdRng::seed_from_u64(42);
        assert_eq!(sample_catalog_ids(&pool, 10, rng), pool);
    }

    #[test]
    fn smallest_sample_is_drawn_from_serving() {
        let serving = pool("s", 8);
        let source = pool("c", 3000);
        let rng = &mut StdRng::seed_from_u64(1);
        let samples = draw_samples(&serving, &source, &[1000, 10, 100, 2000, 100], rng);
        assert_eq!(
            samples.iter().map(|s| s.size).collect::<Vec<_>>(),
            [10, 100, 1000, 2000]
        );
        assert_eq!(samples[0].ids, serving);
        assert_eq!(samples[1].ids.len(), 100);
        assert_eq!(samples[3].ids.len(), 2000);
        assert!(samples[2].ids.iter().all(|id| id.0.starts_with('c')));
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let source = pool("c", 100);
        let first = sample_catalog_ids(&source, 10, &mut StdRng::seed_from_u64(9));
        let second = sample_catalog_ids(&source, 10, &mut StdRng::seed_from_u64(9));
        assert_eq!(first, second);
    }
}
