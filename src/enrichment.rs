// 🧮 Enrichment Engine - ventas × población × empresas → regional panel
//
// 1. Discover the sales region + amount columns
// 2. Group sales by normalized departamento (sum, count, mean)
// 3. Left-join population (missing stays missing)
// 4. Left-join business counts (missing becomes 0)
// 5. Market intensity + standardized development index

use crate::columns::ColumnRole;
use crate::departamentos::normalize_cell;
use crate::error::Result;
use crate::panel::{PanelRow, RegionalPanel};
use crate::sources::{BusinessCountTable, PopulationTable};
use crate::table::{parse_number, Table};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// ============================================================================
// JOIN POLICIES
// ============================================================================

/// What a left-join does with a region that has no match on the right side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Leave the value missing
    KeepMissing,
    /// Substitute zero
    FillZero,
}

/// A named left-join onto the sales summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSpec {
    pub column: &'static str,
    pub missing: MissingPolicy,
}

impl JoinSpec {
    /// Value stored in the panel for a (possibly unmatched) lookup
    pub fn resolve(&self, matched: Option<u64>) -> Option<u64> {
        match self.missing {
            MissingPolicy::KeepMissing => matched,
            MissingPolicy::FillZero => Some(matched.unwrap_or(0)),
        }
    }
}

/// Population join: unmatched regions keep a missing Poblacion
pub const POBLACION_JOIN: JoinSpec = JoinSpec {
    column: "Poblacion",
    missing: MissingPolicy::KeepMissing,
};

/// Business join: unmatched regions get Empresas = 0
pub const EMPRESAS_JOIN: JoinSpec = JoinSpec {
    column: "Empresas",
    missing: MissingPolicy::FillZero,
};

// ============================================================================
// SALES SUMMARY
// ============================================================================

/// Sales aggregated per departamento
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalSalesSummary {
    pub departamento: String,
    /// Sum of parseable amounts (0 when none parse)
    pub ventas_total: f64,
    /// Number of sales rows, whether or not the amount parsed
    pub operaciones: u64,
    /// Mean of parseable amounts (NaN when none parse)
    pub ticket_promedio: f64,
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    amounts: u64,
    rows: u64,
}

/// Group sales rows by normalized departamento, ordered by departamento.
/// Rows without a departamento are dropped.
pub fn summarize_ventas(ventas: &Table) -> Result<Vec<RegionalSalesSummary>> {
    let region = ColumnRole::SalesRegion.find(ventas.name(), ventas.headers())?;
    let amount = ColumnRole::Amount.find(ventas.name(), ventas.headers())?;
    info!(
        region = %region.header,
        amount = %amount.header,
        keyword = amount.keyword,
        "ventas columns"
    );

    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut dropped = 0usize;
    let mut unparseable = 0usize;

    for row in ventas.rows() {
        let depto = row.get(region.index).and_then(|c| c.as_deref());
        let Some(depto) = normalize_cell(depto) else {
            dropped += 1;
            continue;
        };

        let acc = groups.entry(depto).or_default();
        acc.rows += 1;

        let raw = row.get(amount.index).and_then(|c| c.as_deref());
        match parse_number(raw) {
            Some(value) => {
                acc.sum += value;
                acc.amounts += 1;
            }
            None if raw.is_some() => unparseable += 1,
            None => {}
        }
    }

    if dropped > 0 {
        warn!(dropped, "sales rows without departamento");
    }
    if unparseable > 0 {
        warn!(unparseable, column = %amount.header, "unparseable sales amounts treated as missing");
    }

    Ok(groups
        .into_iter()
        .map(|(departamento, acc)| RegionalSalesSummary {
            departamento,
            ventas_total: acc.sum,
            operaciones: acc.rows,
            ticket_promedio: if acc.amounts == 0 {
                f64::NAN
            } else {
                acc.sum / acc.amounts as f64
            },
        })
        .collect())
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Median of the present values; NaN when there are none
pub fn median(values: &[Option<f64>]) -> f64 {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return f64::NAN;
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    }
}

/// Replace missing entries with the column's own median
pub fn fill_median(values: &[Option<f64>]) -> Vec<f64> {
    let fill = median(values);
    values.iter().map(|v| v.unwrap_or(fill)).collect()
}

/// Standard scores with the population standard deviation (divide by N).
///
/// A column with zero spread has no defined score: every entry is NaN.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    if values.iter().all(|v| *v == values[0]) {
        return vec![f64::NAN; values.len()];
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = variance.sqrt();

    values.iter().map(|v| (v - mean) / sd).collect()
}

// ============================================================================
// ENRICHMENT
// ============================================================================

/// Build the regional panel: one row per departamento present in sales
pub fn enrich(
    ventas: Table,
    poblacion: PopulationTable,
    empresas: BusinessCountTable,
) -> Result<RegionalPanel> {
    let summary = summarize_ventas(&ventas)?;
    debug!(groups = summary.len(), "ventas aggregated");

    let mut unmatched_pop = 0usize;
    let mut unmatched_emp = 0usize;
    let mut rows: Vec<PanelRow> = summary
        .into_iter()
        .map(|s| {
            let matched_pop = poblacion.poblacion(&s.departamento);
            let matched_emp = empresas.empresas(&s.departamento);
            unmatched_pop += usize::from(matched_pop.is_none());
            unmatched_emp += usize::from(matched_emp.is_none());

            let pob = POBLACION_JOIN.resolve(matched_pop);
            let emp = EMPRESAS_JOIN.resolve(matched_emp);
            let intensidad = match pob {
                Some(p) => s.ventas_total / p as f64,
                None => f64::NAN,
            };

            PanelRow {
                departamento: s.departamento,
                ventas_total: s.ventas_total,
                operaciones: s.operaciones,
                ticket_promedio: s.ticket_promedio,
                poblacion: pob,
                empresas: emp,
                intensidad_mercado: intensidad,
                z_pop: f64::NAN,
                z_emp: f64::NAN,
                nivel_desarrollo_regional: f64::NAN,
            }
        })
        .collect();

    let pop: Vec<Option<f64>> = rows.iter().map(|r| r.poblacion.map(|p| p as f64)).collect();
    let emp: Vec<Option<f64>> = rows.iter().map(|r| r.empresas.map(|e| e as f64)).collect();
    let z_pop = zscore(&fill_median(&pop));
    let z_emp = zscore(&fill_median(&emp));

    for (i, row) in rows.iter_mut().enumerate() {
        row.z_pop = z_pop[i];
        row.z_emp = z_emp[i];
        row.nivel_desarrollo_regional = (z_pop[i] + z_emp[i]) / 2.0;
    }

    for (join, unmatched) in [(POBLACION_JOIN, unmatched_pop), (EMPRESAS_JOIN, unmatched_emp)] {
        if unmatched > 0 {
            warn!(
                join = join.column,
                policy = ?join.missing,
                unmatched,
                "departamentos without a match in left-join"
            );
        }
    }
    info!(rows = rows.len(), "panel built");

    Ok(RegionalPanel::new(rows))
}

// ============================================================================
// TESTS
// ============================================================================
