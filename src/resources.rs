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

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{bail, Context, Error};
use serde::Serialize;

use crate::benchmarks::latency::Measurement;

/// One row per keyword, one latency column per measured or derived metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub keyword: String,
    /// `None` where the latency couldn't be measured.
    pub cells: Vec<Option<f64>>,
}

impl ResultTable {
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn push(
        &mut self,
        keyword: impl Into<String>,
        cells: Vec<Option<f64>>,
    ) -> Result<(), Error> {
        if cells.len() != self.columns.len() {
            bail!(
                "row has {} cells but the table has {} columns",
                cells.len(),
                self.columns.len()
            );
        }
        self.rows.push(ResultRow {
            keyword: keyword.into(),
            cells,
        });
        Ok(())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        let column = self.columns.iter().position(|name| name == column)?;
        self.rows.get(row)?.cells[column]
    }

    pub fn write_csv_to(&self, writer: impl Write) -> Result<(), Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(
            std::iter::once("query").chain(self.columns.iter().map(String::as_str)),
        )?;
        for ResultRow { keyword, cells } in &self.rows {
            let cells = cells
                .iter()
                .map(|cell| cell.map(|value| value.to_string()).unwrap_or_default());
            writer.write_record(std::iter::once(keyword.clone()).chain(cells))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Replaces whatever is at `path`.
    pub fn write_csv(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        self.write_csv_to(BufWriter::new(file))
    }
}

/// Optional JSON lines log of the raw readings behind every table cell.
pub struct ReadingsLog {
    writer: Option<Box<dyn Write>>,
}

#[derive(Serialize)]
struct ReadingsEntry<'a> {
    keyword: &'a str,
    variant: &'a str,
    endpoint: &'a str,
    mean: Option<f64>,
    readings: &'a [u64],
    skipped: usize,
    error: Option<String>,
}

impl ReadingsLog {
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn create(path: &Path) -> Result<Self, Error> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self::to_writer(BufWriter::new(file)))
    }

    pub fn to_writer(writer: impl Write + 'static) -> Self {
        Self {
            writer: Some(Box::new(writer)),
        }
    }

    pub fn record(
        &mut self,
        keyword: &str,
        variant: &str,
        endpoint: &str,
        measurement: &Measurement,
    ) -> Result<(), Error> {
        let Some(writer) = &mut self.writer else {
            return Ok(());
        };
        let entry = match measurement {
            Measurement::Available(sample) => ReadingsEntry {
                keyword,
                variant,
                endpoint,
                mean: Some(sample.mean),
                readings: &sample.readings,
                skipped: sample.skipped,
                error: None,
            },
            Measurement::Unavailable(error) => ReadingsEntry {
                keyword,
                variant,
                endpoint,
                mean: None,
                readings: &[],
                skipped: 0,
                error: Some(error.to_string()),
            },
        };
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(self) -> Result<(), io::Error> {
        match self.writer {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}
