// 📊 Regional Panel - final table + delimited-text writer
// One row per departamento present in sales, columns in computation order.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One departamento of the enriched panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    #[serde(rename = "Departamento")]
    pub departamento: String,

    #[serde(with = "na")]
    pub ventas_total: f64,

    pub operaciones: u64,

    #[serde(with = "na")]
    pub ticket_promedio: f64,

    #[serde(rename = "Poblacion")]
    pub poblacion: Option<u64>,

    #[serde(rename = "Empresas")]
    pub empresas: Option<u64>,

    /// ventas_total / Poblacion (NaN without population, inf with zero)
    #[serde(with = "na")]
    pub intensidad_mercado: f64,

    #[serde(with = "na")]
    pub z_pop: f64,

    #[serde(with = "na")]
    pub z_emp: f64,

    /// (z_pop + z_emp) / 2
    #[serde(with = "na")]
    pub nivel_desarrollo_regional: f64,
}

impl PanelRow {
    /// Output header, in computation order
    pub const COLUMNS: [&'static str; 10] = [
        "Departamento",
        "ventas_total",
        "operaciones",
        "ticket_promedio",
        "Poblacion",
        "Empresas",
        "intensidad_mercado",
        "z_pop",
        "z_emp",
        "nivel_desarrollo_regional",
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionalPanel {
    rows: Vec<PanelRow>,
}

impl RegionalPanel {
    pub fn new(rows: Vec<PanelRow>) -> Self {
        RegionalPanel { rows }
    }

    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }

    pub fn row(&self, departamento: &str) -> Option<&PanelRow> {
        self.rows.iter().find(|r| r.departamento == departamento)
    }

    pub fn departamentos(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.departamento.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// WRITER / READER
// ============================================================================

/// Write the panel as UTF-8 CSV, replacing any existing file
pub fn write_panel(panel: &RegionalPanel, path: &Path) -> Result<()> {
    // Header written by hand so an empty panel still gets one
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    writer
        .write_record(PanelRow::COLUMNS)
        .context("Failed to write panel header")?;
    for row in &panel.rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write panel row {}", row.departamento))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Read back a panel written by `write_panel`
pub fn read_panel(path: &Path) -> Result<RegionalPanel> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open panel file: {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: PanelRow = result.context("Failed to deserialize panel row")?;
        rows.push(row);
    }
    Ok(RegionalPanel::new(rows))
}

/// NaN ⇄ empty cell; infinities as `inf` / `-inf`
mod na {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(f64::NAN),
            Some(s) => s.parse::<f64>().map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(depto: &str, poblacion: Option<u64>, intensidad: f64) -> PanelRow {
        PanelRow {
            departamento: depto.to_string(),
            ventas_total: 150.0,
            operaciones: 2,
            ticket_promedio: 75.0,
            poblacion,
            empresas: Some(10),
            intensidad_mercado: intensidad,
            z_pop: 1.0,
            z_emp: -1.0,
            nivel_desarrollo_regional: 0.0,
        }
    }

    #[test]
    fn test_header_in_computation_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.csv");

        write_panel(&RegionalPanel::new(vec![row("ROCHA", Some(1000), 0.15)]), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "Departamento,ventas_total,operaciones,ticket_promedio,Poblacion,Empresas,\
             intensidad_mercado,z_pop,z_emp,nivel_desarrollo_regional"
        );
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.csv");
        let panel = RegionalPanel::new(vec![
            row("MONTEVIDEO", Some(1000), 0.15),
            row("SAN JOSÉ", None, f64::NAN),
            row("FLORES", Some(0), f64::INFINITY),
        ]);

        write_panel(&panel, &path).unwrap();
        let back = read_panel(&path).unwrap();

        assert_eq!(back.len(), 3);
        assert_eq!(back.rows()[0], panel.rows()[0]);

        let sj = back.row("SAN JOSÉ").unwrap();
        assert_eq!(sj.poblacion, None);
        assert!(sj.intensidad_mercado.is_nan());

        let flores = back.row("FLORES").unwrap();
        assert_eq!(flores.poblacion, Some(0));
        assert!(flores.intensidad_mercado.is_infinite());
    }

    #[test]
    fn test_missing_values_written_as_empty_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.csv");
        write_panel(&RegionalPanel::new(vec![row("SALTO", None, f64::NAN)]), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let data = content.lines().nth(1).unwrap();
        let cells: Vec<&str> = data.split(',').collect();
        assert_eq!(cells[0], "SALTO");
        assert_eq!(cells[4], "");
        assert_eq!(cells[6], "");
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.csv");
        std::fs::write(&path, "old content\nthat is much longer than the new one\n\n\n").unwrap();

        write_panel(&RegionalPanel::default(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("Departamento,"));
    }
}
