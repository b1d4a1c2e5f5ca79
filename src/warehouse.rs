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

//! Reads from the data warehouse.
//!
//! The warehouse is only ever asked to run a SQL query and hand back the complete result,
//! everything else (the SQL text, decoding the cells) lives here.

use anyhow::{anyhow, Context, Error};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{config::Config, distribution::CatalogId, dsl::CategoryWeights};

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Table, Error>;
}

/// A fully materialized query result, cells as the warehouse renders them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Result<usize, Error> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| anyhow!("missing column {name:?}, got: {:?}", self.columns))
    }

    fn cell<'a>(row: &'a [Option<String>], idx: usize) -> Option<&'a str> {
        row.get(idx).and_then(|cell| cell.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRow {
    pub keyword: String,
    pub query_count: u64,
    /// Share of all queries in the date range.
    pub share: f64,
    pub cumulative_share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorizedKeyword {
    pub keyword: KeywordRow,
    /// Empty if the keyword has no classification for the run date.
    pub weights: CategoryWeights,
}

/// Which number a boosted category is weighted with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryWeightMode {
    /// Every boosted category weighs 1, the classifier's confidence is dropped.
    #[default]
    Flat,
    Probability,
    Score,
}

/// One element of the serialized `category_weights` array.
#[derive(Debug, Deserialize)]
struct CategoryWeightRecord {
    hoian_category_name: Option<String>,
    /// Unclassified entries come with a null flag.
    is_boost: Option<bool>,
    probability: Option<f64>,
    score: Option<f64>,
}

/// Collapses the serialized classification of a keyword into weights of its boosted categories.
pub fn parse_category_weights(
    json: &str,
    mode: CategoryWeightMode,
) -> Result<CategoryWeights, Error> {
    let records: Vec<CategoryWeightRecord> =
        serde_json::from_str(json).context("malformed category weights")?;
    Ok(records
        .into_iter()
        .filter(|record| record.is_boost == Some(true))
        .filter_map(|record| {
            let weight = match mode {
                CategoryWeightMode::Flat => 1.,
                CategoryWeightMode::Probability => record.probability.unwrap_or(0.),
                CategoryWeightMode::Score => record.score.unwrap_or(0.),
            };
            Some((record.hoian_category_name?, weight))
        })
        .collect())
}

pub fn top_keywords_sql(config: &Config) -> String {
    format!(
        "SELECT
  queryText,
  qc,
  qc / total_qc AS qc_percentage,
  SUM(qc / total_qc) OVER (ORDER BY qc DESC) AS cumulative_qc_percentage
FROM (
  SELECT
    queryText,
    COUNT(*) AS qc,
    SUM(COUNT(*)) OVER () AS total_qc
  FROM
    `{query_log}`
  WHERE
    TIMESTAMP_TRUNC(requestedAt, DAY) BETWEEN TIMESTAMP(\"{start}\") AND TIMESTAMP(\"{end}\")
    AND queryText IS NOT NULL
  GROUP BY
    queryText )
ORDER BY
  qc DESC
LIMIT
  {limit}",
        query_log = config.warehouse.query_log_table,
        start = config.date_range.start,
        end = config.date_range.end,
        limit = config.keyword_limit,
    )
}

pub fn categorized_keywords_sql(config: &Config, run_date: NaiveDate) -> String {
    let warehouse = &config.warehouse;
    format!(
        "WITH
  TARGET_TABLE AS (
  SELECT
    kw_cat.keyword,
    kw_cat.run_date,
    cw.category_id,
    cw.category_name,
    cat.uid AS hoian_category_name,
    cw.predict,
    cw.is_boost,
    cw.probability,
    cw.score
  FROM
    `{category_weights}` AS kw_cat,
    UNNEST(kw_cat.category_weights) AS cw
  LEFT JOIN
    `{categories}` AS cat
  ON
    cw.category_id = cat.id
  WHERE
    kw_cat.run_date = DATE(\"{run_date}\") ),
  CATEGORY_WEIGHT AS (
  SELECT
    keyword,
    TO_JSON_STRING(ARRAY_AGG(STRUCT(category_id,
          category_name,
          hoian_category_name,
          predict,
          is_boost,
          probability,
          score))) AS category_weights
  FROM
    TARGET_TABLE
  GROUP BY
    keyword ),
  QC AS (
{top_keywords} )
SELECT
  QC.queryText,
  QC.qc,
  QC.qc_percentage,
  QC.cumulative_qc_percentage,
  cw.category_weights
FROM
  QC
LEFT JOIN
  CATEGORY_WEIGHT cw
ON
  TRIM(QC.queryText) = cw.keyword
ORDER BY
  QC.qc DESC",
        category_weights = warehouse.category_weights_table,
        categories = warehouse.categories_table,
        top_keywords = top_keywords_sql(config),
    )
}

pub fn catalog_ids_sql(table: &str) -> String {
    format!("SELECT DISTINCT catalog_id FROM `{table}` WHERE deleted_at IS NULL")
}

fn parse_cell<T>(row: &[Option<String>], idx: usize, name: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Table::cell(row, idx)
        .ok_or_else(|| anyhow!("missing value in column {name:?}"))?
        .parse()
        .with_context(|| format!("malformed value in column {name:?}"))
}

fn keyword_rows(table: &Table) -> Result<Vec<KeywordRow>, Error> {
    let keyword = table.column("queryText")?;
    let query_count = table.column("qc")?;
    let share = table.column("qc_percentage")?;
    let cumulative_share = table.column("cumulative_qc_percentage")?;

    table
        .rows
        .iter()
        .map(|row| {
            Ok(KeywordRow {
                keyword: parse_cell(row, keyword, "queryText")?,
                query_count: parse_cell(row, query_count, "qc")?,
                share: parse_cell(row, share, "qc_percentage")?,
                cumulative_share: parse_cell(row, cumulative_share, "cumulative_qc_percentage")?,
            })
        })
        .collect()
}

/// The most frequent keywords of the configured date range, most frequent first.
pub async fn load_top_keywords(
    warehouse: &(impl Warehouse + ?Sized),
    config: &Config,
) -> Result<Vec<KeywordRow>, Error> {
    let table = warehouse
        .query(&top_keywords_sql(config))
        .await
        .context("load top keywords")?;
    keyword_rows(&table)
}

/// Like [`load_top_keywords`] but with the category weights of each keyword attached.
pub async fn load_categorized_keywords(
    warehouse: &(impl Warehouse + ?Sized),
    config: &Config,
) -> Result<Vec<CategorizedKeyword>, Error> {
    let run_date = config.warehouse.category_run_date()?;
    let table = warehouse
        .query(&categorized_keywords_sql(config, run_date))
        .await
        .context("load categorized keywords")?;
    let weights = table.column("category_weights")?;

    keyword_rows(&table)?
        .into_iter()
        .zip(&table.rows)
        .map(|(keyword, row)| {
            let weights = match Table::cell(row, weights) {
                Some(json) => parse_category_weights(json, config.category_weight_mode)
                    .with_context(|| format!("keyword {:?}", keyword.keyword))?,
                None => CategoryWeights::default(),
            };
            Ok(CategorizedKeyword { keyword, weights })
        })
        .collect()
}

pub async fn load_catalog_ids(
    warehouse: &(impl Warehouse + ?Sized),
    table: &str,
) -> Result<Vec<CatalogId>, Error> {
    let result = warehouse
        .query(&catalog_ids_sql(table))
        .await
        .with_context(|| format!("load catalog ids of {table}"))?;
    let column = result.column("catalog_id")?;
    Ok(result
        .rows
        .iter()
        .filter_map(|row| Table::cell(row, column))
        .map(CatalogId::from)
        .collect())
}
