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

//! Run configuration.
//!
//! Every field has a default taken from [`crate::consts`], so an empty file (or no file at all)
//! reproduces the historical runs. Unknown fields are rejected to catch typos early.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Error};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;

use crate::{benchmarks::latency::RetryPolicy, consts, warehouse::CategoryWeightMode};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub index_name: String,
    pub search_endpoints: SearchEndpoints,
    pub date_range: DateRange,
    pub keyword_limit: usize,
    pub warehouse: WarehouseConfig,
    pub category_weight_mode: CategoryWeightMode,
    pub retry: RetryConfig,
    pub category_match: CategoryMatchConfig,
    pub terms_filter: TermsFilterConfig,
}

impl Config {
    pub fn load(file: impl AsRef<Path>) -> Result<Self, Error> {
        let file = file.as_ref();
        let text = fs::read_to_string(file)
            .with_context(|| format!("read config {}", file.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("parse config {}", file.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.date_range.start > self.date_range.end {
            bail!(
                "date range starts after it ends: {} > {}",
                self.date_range.start,
                self.date_range.end
            );
        }
        if self.keyword_limit == 0 {
            bail!("keyword_limit must be positive");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        for (name, iterations) in [
            (
                "category_match.production_iterations",
                self.category_match.production_iterations,
            ),
            (
                "category_match.staging_iterations",
                self.category_match.staging_iterations,
            ),
            (
                "terms_filter.production_iterations",
                self.terms_filter.production_iterations,
            ),
            (
                "terms_filter.staging_iterations",
                self.terms_filter.staging_iterations,
            ),
        ] {
            if iterations == 0 {
                bail!("{name} must be positive");
            }
        }
        if self.terms_filter.sample_sizes.is_empty() {
            bail!("terms_filter.sample_sizes must not be empty");
        }
        if self.terms_filter.sample_sizes.contains(&0) {
            bail!("terms_filter.sample_sizes must not contain 0");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_name: consts::INDEX_NAME.into(),
            search_endpoints: SearchEndpoints::default(),
            date_range: DateRange::default(),
            keyword_limit: consts::KEYWORD_LIMIT,
            warehouse: WarehouseConfig::default(),
            category_weight_mode: CategoryWeightMode::default(),
            retry: RetryConfig::default(),
            category_match: CategoryMatchConfig::default(),
            terms_filter: TermsFilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchEndpoints {
    pub staging: String,
    pub production: String,
}

impl Default for SearchEndpoints {
    fn default() -> Self {
        Self {
            staging: consts::STAGING_ENDPOINT.into(),
            production: consts::PRODUCTION_ENDPOINT.into(),
        }
    }
}

/// Inclusive range of days the keyword popularity is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateRange {
    fn default() -> Self {
        let (year, month, day) = consts::DATE_RANGE_START;
        let start = NaiveDate::from_ymd_opt(year, month, day).expect("valid default start date");
        let (year, month, day) = consts::DATE_RANGE_END;
        let end = NaiveDate::from_ymd_opt(year, month, day).expect("valid default end date");
        Self { start, end }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarehouseConfig {
    pub project: String,
    /// Name of the env variable holding an OAuth access token,
    /// e.g. the output of `gcloud auth print-access-token`.
    pub access_token_env: String,
    pub query_log_table: String,
    pub category_weights_table: String,
    pub categories_table: String,
    pub serving_catalog_table: String,
    pub source_catalog_table: String,
    /// Pins the category weights run, otherwise today minus the lag is used.
    pub category_run_date: Option<NaiveDate>,
    pub category_run_date_lag_days: u32,
}

impl WarehouseConfig {
    pub fn category_run_date(&self) -> Result<NaiveDate, Error> {
        if let Some(date) = self.category_run_date {
            return Ok(date);
        }
        Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(self.category_run_date_lag_days.into()))
            .context("category run date out of range")
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project: consts::WAREHOUSE_PROJECT.into(),
            access_token_env: consts::WAREHOUSE_ACCESS_TOKEN_ENV.into(),
            query_log_table: consts::QUERY_LOG_TABLE.into(),
            category_weights_table: consts::CATEGORY_WEIGHTS_TABLE.into(),
            categories_table: consts::CATEGORIES_TABLE.into(),
            serving_catalog_table: consts::SERVING_CATALOG_TABLE.into(),
            source_catalog_table: consts::SOURCE_CATALOG_TABLE.into(),
            category_run_date: None,
            category_run_date_lag_days: consts::CATEGORY_RUN_DATE_LAG_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: consts::RETRY_MAX_ATTEMPTS,
            backoff_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryMatchConfig {
    pub production_iterations: usize,
    pub staging_iterations: usize,
    pub max_pause_ms: u64,
}

impl Default for CategoryMatchConfig {
    fn default() -> Self {
        Self {
            production_iterations: consts::PRODUCTION_ITERATIONS,
            staging_iterations: consts::STAGING_ITERATIONS,
            max_pause_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TermsFilterConfig {
    pub production_iterations: usize,
    pub staging_iterations: usize,
    pub max_pause_ms: u64,
    /// Sizes of the catalog id sets, the smallest is drawn from the serving table.
    pub sample_sizes: Vec<usize>,
    /// Seed for drawing the catalog id samples, random if missing.
    pub seed: Option<u64>,
}

impl Default for TermsFilterConfig {
    fn default() -> Self {
        Self {
            production_iterations: consts::TERMS_PRODUCTION_ITERATIONS,
            staging_iterations: consts::STAGING_ITERATIONS,
            max_pause_ms: consts::TERMS_MAX_PAUSE_MS,
            sample_sizes: consts::TERMS_SAMPLE_SIZES.to_vec(),
            seed: None,
        }
    }
}
