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

/// Share of readings dropped from each end before averaging.
pub const TRIM_DIVISOR: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedMean {
    pub mean: f64,
    /// The readings which were kept, in ascending order.
    pub kept: Vec<u64>,
}

/// Sorts the readings, drops `floor(n / 10)` from each end and averages the rest.
///
/// The mean of nothing is 0.
pub fn trimmed_mean(mut readings: Vec<u64>) -> TrimmedMean {
    readings.sort_unstable();
    let cut = readings.len() / TRIM_DIVISOR;
    let kept = readings[cut..readings.len() - cut].to_vec();
    let mean = if kept.is_empty() {
        0.
    } else {
        kept.iter().map(|&took| took as f64).sum::<f64>() / kept.len() as f64
    };
    TrimmedMean { mean, kept }
}
