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

//! Current query vs. the query restricted to catalog id sets of growing size.

use std::time::Duration;

use anyhow::{bail, Error};
use tracing::info;

use super::{measure, SampleParameters, SearchEndpoint};
use crate::{
    config::Config,
    distribution::{draw_samples, RngBuilder},
    dsl::{self, SearchBody},
    resources::{ReadingsLog, ResultTable},
    warehouse::{load_catalog_ids, load_top_keywords, Warehouse},
};

/// Result columns for the given sample sizes, which have to be in ascending order.
pub fn columns(sizes: &[usize]) -> Vec<String> {
    let mut columns = vec!["prod_time_asis".to_owned()];
    columns.extend(sizes.first().map(|size| format!("prod_time_terms{size}")));
    columns.push("alpha_time_asis".to_owned());
    columns.extend(sizes.iter().map(|size| format!("alpha_time_terms{size}")));
    columns
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
    let serving = load_catalog_ids(warehouse, &config.warehouse.serving_catalog_table).await?;
    let source = load_catalog_ids(warehouse, &config.warehouse.source_catalog_table).await?;
    let samples = draw_samples(
        &serving,
        &source,
        &config.terms_filter.sample_sizes,
        &mut RngBuilder::new(config.terms_filter.seed).build(),
    );
    if samples.is_empty() {
        bail!("no catalog id sample sizes configured");
    }
    for sample in &samples {
        info!(size = sample.size, drawn = sample.ids.len(), "catalog id sample");
    }

    let keywords = load_top_keywords(warehouse, config).await?;
    info!(keywords = keywords.len(), "loaded keywords");

    let retry = config.retry.policy();
    let max_pause = Duration::from_millis(config.terms_filter.max_pause_ms);
    let production_params = SampleParameters {
        iterations: config.terms_filter.production_iterations,
        retry,
        max_pause,
    };
    let staging_params = SampleParameters {
        iterations: config.terms_filter.staging_iterations,
        retry,
        max_pause,
    };
    info!(production = %production_params, staging = %staging_params, "sampling parameters");

    let sizes = samples.iter().map(|sample| sample.size).collect::<Vec<_>>();
    let labels = sizes
        .iter()
        .map(|size| format!("terms{size}"))
        .collect::<Vec<_>>();
    let index = config.index_name.as_str();
    let mut table = ResultTable::new(columns(&sizes));

    for (idx, row) in keywords.iter().enumerate() {
        let keyword = row.keyword.as_str();
        info!(
            progress = %format_args!("{}/{}", idx + 1, keywords.len()),
            keyword,
            "measuring keyword"
        );

        let asis = SearchBody::from(dsl::current(keyword));
        let terms = samples
            .iter()
            .map(|sample| SearchBody::from(dsl::terms(keyword, &sample.ids)))
            .collect::<Vec<_>>();

        let mut cells = Vec::with_capacity(table.columns().len());
        cells.push(
            measure(
                log,
                keyword,
                asis.name(),
                production,
                index,
                &asis,
                &production_params,
            )
            .await?,
        );
        cells.push(
            measure(
                log,
                keyword,
                &labels[0],
                production,
                index,
                &terms[0],
                &production_params,
            )
            .await?,
        );
        cells.push(
            measure(log, keyword, asis.name(), staging, index, &asis, &staging_params).await?,
        );
        for (label, body) in labels.iter().zip(&terms) {
            cells.push(measure(log, keyword, label, staging, index, body, &staging_params).await?);
        }

        table.push(keyword, cells)?;
    }

    Ok(table)
}
