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

use std::path::PathBuf;

use ad_query_benchmarks::{
    benchmarks::category_match,
    config::Config,
    consts::RESULTS_FILE,
    databases::{bigquery::BigQuery, elasticsearch::Elasticsearch},
    resources::ReadingsLog,
    utils::init_tracing,
};
use clap::Parser;
use tokio::runtime::Runtime;
use tracing::info;

/// Compares the current ads query with the category boosted variants.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// TOML file overriding the built-in settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the result table is written to, an existing file is replaced.
    #[arg(short, long, default_value = RESULTS_FILE)]
    output: PathBuf,

    /// Also write every raw reading as JSON lines.
    #[arg(long)]
    readings: Option<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let warehouse = BigQuery::from_config(&config.warehouse)?;
    let production = Elasticsearch::new("production", &config.search_endpoints.production)?;
    let staging = Elasticsearch::new("staging", &config.search_endpoints.staging)?;
    let mut log = match &cli.readings {
        Some(path) => ReadingsLog::create(path)?,
        None => ReadingsLog::disabled(),
    };

    let rt = Runtime::new()?;
    let table = rt.block_on(category_match::run(
        &config,
        &warehouse,
        &production,
        &staging,
        &mut log,
    ))?;
    log.finish()?;

    table.write_csv(&cli.output)?;
    info!(rows = table.rows().len(), output = %cli.output.display(), "results written");
    Ok(())
}
