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

//! Current query vs. the category boosted variants.
//!
//! The variants only run against staging. Their production latency is projected from the
//! production latency of the current query, assuming the current query costs the same,
//! relative to the variants, in both environments.

use std::time::Duration;

use anyhow::Error;
use tracing::info;

use super::{measure, SampleParameters, SearchEndpoint};
use crate::{
    config::Config,
    dsl::{self, SearchBody, SortMode},
    resources::{ReadingsLog, ResultTable},
    warehouse::{load_categorized_keywords, CategorizedKeyword, Warehouse},
};

pub const COLUMNS: [&str; 6] = [
    "time_prod_asis",
    "time_prod_idsort_pred",
    "time_prod_randomsort_pred",
    "time_alpha_asis",
    "time_alpha_idsort",
    "time_alpha_randomsort",
];

/// Scales the production latency by the staging speedup of a variant.
pub fn predict_production(
    production_asis: Option<f64>,
    staging_variant: Option<f64>,
    staging_asis: Option<f64>,
) -> Option<f64> {
    let (production_asis, staging_variant, staging_asis) =
        (production_asis?, staging_variant?, staging_asis?);
    (staging_asis != 0.).then(|| production_asis * (staging_variant / staging_asis))
}

pub async fn run<W, P, S>(
    config: &Config,
    warehouse: &W,
    production: &P,
    staging: &S,
    log: &mut ReadingsLog,
) -> Result<ResultTable, Error>
where
    W: Warehouse + ?Sized,
    P: SearchEndpoint + ?Sized,
    S: SearchEndpoint + ?Sized,
{
    let keywords = load_categorized_keywords(warehouse, config).await?;
    info!(keywords = keywords.len(), "loaded keywords");

    let retry = config.retry.policy();
    let max_pause = Duration::from_millis(config.category_match.max_pause_ms);
    let production_params = SampleParameters {
        iterations: config.category_match.production_iterations,
        retry,
        max_pause,
    };
    let staging_params = SampleParameters {
        iterations: config.category_match.staging_iterations,
        retry,
        max_pause,
    };
    info!(production = %production_params, staging = %staging_params, "sampling parameters");

    let index = config.index_name.as_str();
    let mut table = ResultTable::new(COLUMNS);
    for (idx, CategorizedKeyword { keyword, weights }) in keywords.iter().enumerate() {
        let keyword = keyword.keyword.as_str();
        info!(
            progress = %format_args!("{}/{}", idx + 1, keywords.len()),
            keyword,
            categories = weights.len(),
            "measuring keyword"
        );

        let asis = SearchBody::from(dsl::current(keyword));
        let idsort = SearchBody::from(dsl::category_match(keyword, weights, SortMode::IdSort));
        let randomsort =
            SearchBody::from(dsl::category_match(keyword, weights, SortMode::RandomSort));

        // later measurements see a warmer cluster, keep this order to stay comparable
        let prod_asis = measure(
            log,
            keyword,
            asis.name(),
            production,
            index,
            &asis,
            &production_params,
        )
        .await?;
        let alpha_asis =
            measure(log, keyword, asis.name(), staging, index, &asis, &staging_params).await?;
        let alpha_idsort = measure(
            log,
            keyword,
            idsort.name(),
            staging,
            index,
            &idsort,
            &staging_params,
        )
        .await?;
        let alpha_randomsort = measure(
            log,
            keyword,
            randomsort.name(),
            staging,
            index,
            &randomsort,
            &staging_params,
        )
        .await?;

        table.push(
            keyword,
            vec![
                prod_asis,
                predict_production(prod_asis, alpha_idsort, alpha_asis),
                predict_production(prod_asis, alpha_randomsort, alpha_asis),
                alpha_asis,
                alpha_idsort,
                alpha_randomsort,
            ],
        )?;
    }

    Ok(table)
}
