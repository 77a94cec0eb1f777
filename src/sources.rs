// 📥 Source Loaders - ventas, población, empresas
// Each loader fetches raw bytes, decodes a Table, then discovers its columns.

use crate::columns::ColumnRole;
use crate::departamentos::normalize_cell;
use crate::error::Result as EnrichResult;
use crate::table::{parse_number, Table};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

// ============================================================================
// FETCH COLLABORATOR
// ============================================================================

/// Retrieves the raw bytes of a remote resource
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("uy-enrichment/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad HTTP status from {}", url))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// REFERENCE TABLES
// ============================================================================

/// Departamento → population. A region may be present with a missing count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTable {
    entries: BTreeMap<String, Option<u64>>,
}

impl PopulationTable {
    /// Insert unless the departamento is already present; returns false on duplicates
    pub fn insert(&mut self, departamento: String, poblacion: Option<u64>) -> bool {
        if self.entries.contains_key(&departamento) {
            return false;
        }
        self.entries.insert(departamento, poblacion);
        true
    }

    /// Population of a departamento, None when absent or missing
    pub fn poblacion(&self, departamento: &str) -> Option<u64> {
        self.entries.get(departamento).copied().flatten()
    }

    pub fn departamentos(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for PopulationTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut table = PopulationTable::default();
        for (depto, poblacion) in iter {
            table.insert(depto.into(), Some(poblacion));
        }
        table
    }
}

/// Departamento → number of registered businesses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessCountTable {
    counts: BTreeMap<String, u64>,
}

impl BusinessCountTable {
    pub fn increment(&mut self, departamento: String) {
        *self.counts.entry(departamento).or_insert(0) += 1;
    }

    pub fn empresas(&self, departamento: &str) -> Option<u64> {
        self.counts.get(departamento).copied()
    }

    pub fn departamentos(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for BusinessCountTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let counts = iter.into_iter().map(|(d, n)| (d.into(), n)).collect();
        BusinessCountTable { counts }
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Sales are loaded verbatim; region and amount discovery happens in enrichment
pub fn load_ventas(fetcher: &dyn Fetcher, url: &str) -> Result<Table> {
    let bytes = fetcher.fetch(url)?;
    let table = Table::from_csv_bytes("ventas", &bytes)
        .with_context(|| format!("Failed to decode sales CSV from {}", url))?;
    info!(rows = table.len(), columns = table.headers().len(), "loaded ventas");
    Ok(table)
}

pub fn load_poblacion(fetcher: &dyn Fetcher, url: &str) -> Result<PopulationTable> {
    let bytes = fetcher.fetch(url)?;
    let table = Table::from_csv_bytes("poblacion", &bytes)
        .with_context(|| format!("Failed to decode population CSV from {}", url))?;
    let poblacion = poblacion_from_table(&table)?;
    info!(departamentos = poblacion.len(), "loaded poblacion");
    Ok(poblacion)
}

pub fn load_empresas(fetcher: &dyn Fetcher, url: &str) -> Result<BusinessCountTable> {
    let bytes = fetcher.fetch(url)?;
    let table = Table::from_xlsx_bytes("empresas", &bytes)
        .with_context(|| format!("Failed to decode business spreadsheet from {}", url))?;
    let empresas = empresas_from_table(&table)?;
    info!(
        rows = table.len(),
        departamentos = empresas.len(),
        "loaded empresas"
    );
    Ok(empresas)
}

/// Discover region + population columns and build the population table
pub fn poblacion_from_table(table: &Table) -> EnrichResult<PopulationTable> {
    let region = ColumnRole::Region.find(table.name(), table.headers())?;
    let count = ColumnRole::Population.find(table.name(), table.headers())?;
    debug!(region = %region.header, poblacion = %count.header, "poblacion columns");

    let mut poblacion = PopulationTable::default();
    for row in table.rows() {
        let Some(depto) = normalize_cell(cell(row, region.index)) else {
            continue;
        };
        let raw = cell(row, count.index);
        let value = parse_count(raw);
        if value.is_none() && raw.is_some() {
            warn!(departamento = %depto, raw = ?raw, "unparseable population count");
        }
        if !poblacion.insert(depto.clone(), value) {
            warn!(departamento = %depto, "duplicate population row ignored");
        }
    }
    Ok(poblacion)
}

/// Count registry rows per normalized departamento
pub fn empresas_from_table(table: &Table) -> EnrichResult<BusinessCountTable> {
    let region = ColumnRole::Region.find(table.name(), table.headers())?;
    debug!(region = %region.header, "empresas column");

    let mut empresas = BusinessCountTable::default();
    let mut skipped = 0usize;
    for depto in table.column(region.index) {
        match normalize_cell(depto) {
            Some(d) => empresas.increment(d),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "business rows without departamento");
    }
    Ok(empresas)
}

fn cell(row: &[Option<String>], index: usize) -> Option<&str> {
    row.get(index).and_then(|c| c.as_deref())
}

fn parse_count(cell: Option<&str>) -> Option<u64> {
    parse_number(cell)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64)
}

// ============================================================================
// TESTS
// ============================================================================
