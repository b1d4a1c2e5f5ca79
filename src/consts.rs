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

//! Defaults for every configurable value.
//!
//! These reproduce the runs the result tables in the past were created with,
//! changing them makes new tables incomparable with old ones.

pub const STAGING_ENDPOINT: &str = "http://search-searching.alpha.kr.krmt.io";
pub const PRODUCTION_ENDPOINT: &str = "http://search-searching.kr.krmt.io";
pub const INDEX_NAME: &str = "ads-catalog-product-serving-v2";

pub const WAREHOUSE_PROJECT: &str = "karrotmarket";
pub const WAREHOUSE_ACCESS_TOKEN_ENV: &str = "BIGQUERY_ACCESS_TOKEN";
pub const QUERY_LOG_TABLE: &str = "karrotmarket.kotisaari_data.stream_mediation-request_v1";
pub const CATEGORY_WEIGHTS_TABLE: &str =
    "karrotmarket.team_search_data.fleamarket_category_weights";
pub const CATEGORIES_TABLE: &str = "karrotmarket.db_hoian_kr.categories";
pub const SERVING_CATALOG_TABLE: &str =
    "karrotmarket.team_search_indexer_kr.ads_catalog_product_serving_v2";
pub const SOURCE_CATALOG_TABLE: &str = "karrotmarket.team_search_indexer_kr.ads_catalog_product_v2";
/// Category weights are computed with a delay, the newest complete run is two days old.
pub const CATEGORY_RUN_DATE_LAG_DAYS: u32 = 2;

pub const DATE_RANGE_START: (i32, u32, u32) = (2024, 9, 1);
pub const DATE_RANGE_END: (i32, u32, u32) = (2024, 9, 7);
pub const KEYWORD_LIMIT: usize = 100;

pub const RETRY_MAX_ATTEMPTS: u32 = 3;

pub const STAGING_ITERATIONS: usize = 50;
pub const PRODUCTION_ITERATIONS: usize = 50;
// fewer calls against production to limit the load we put on it
pub const TERMS_PRODUCTION_ITERATIONS: usize = 20;
pub const TERMS_MAX_PAUSE_MS: u64 = 1000;
pub const TERMS_SAMPLE_SIZES: [usize; 4] = [10, 100, 1000, 2000];

pub const RESULTS_FILE: &str = "results.csv";
