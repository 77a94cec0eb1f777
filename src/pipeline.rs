// 🔁 Pipeline - load → enrich → write, once per run

use crate::config::{PipelineConfig, UnmatchedRegionPolicy};
use crate::departamentos::is_canonical;
use crate::enrichment::enrich;
use crate::error::EnrichError;
use crate::panel::{write_panel, RegionalPanel};
use crate::sources::{load_empresas, load_poblacion, load_ventas, Fetcher};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub ventas_rows: usize,
    pub poblacion_departamentos: usize,
    pub empresas_departamentos: usize,
    pub panel_rows: usize,
    /// Panel departamentos outside the canonical set
    pub unmatched_regions: Vec<String>,
    pub output_path: PathBuf,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} ventas rows, {} población / {} empresas departamentos → {} departamentos ({} unmatched) in {} ms",
            self.ventas_rows,
            self.poblacion_departamentos,
            self.empresas_departamentos,
            self.panel_rows,
            self.unmatched_regions.len(),
            (self.finished_at - self.started_at).num_milliseconds()
        )
    }
}

/// Run the whole job. Any error aborts before the output file is touched.
pub fn run(config: &PipelineConfig, fetcher: &dyn Fetcher) -> Result<RunReport> {
    let started_at = Utc::now();

    let ventas = load_ventas(fetcher, &config.ventas_url)?;
    let poblacion = load_poblacion(fetcher, &config.poblacion_url)?;
    let empresas = load_empresas(fetcher, &config.empresas_url)?;

    for (table, names) in [
        ("poblacion", poblacion.departamentos().collect::<Vec<_>>()),
        ("empresas", empresas.departamentos().collect::<Vec<_>>()),
    ] {
        let unmatched: Vec<&str> = names.into_iter().filter(|n| !is_canonical(n)).collect();
        if !unmatched.is_empty() {
            warn!(table, ?unmatched, "reference rows outside the departamento set");
        }
    }

    let ventas_rows = ventas.len();
    let poblacion_departamentos = poblacion.len();
    let empresas_departamentos = empresas.len();

    let panel = enrich(ventas, poblacion, empresas)?;
    let unmatched_regions = check_unmatched(&panel, config.unmatched_regions)?;

    let output_path = PathBuf::from(&config.output_path);
    write_panel(&panel, Path::new(&config.output_path))?;
    info!(path = %output_path.display(), rows = panel.len(), "panel written");

    Ok(RunReport {
        started_at,
        finished_at: Utc::now(),
        ventas_rows,
        poblacion_departamentos,
        empresas_departamentos,
        panel_rows: panel.len(),
        unmatched_regions,
        output_path,
    })
}

/// Collect panel departamentos outside the canonical set, rejecting them if asked
fn check_unmatched(
    panel: &RegionalPanel,
    policy: UnmatchedRegionPolicy,
) -> Result<Vec<String>, EnrichError> {
    let unmatched: Vec<String> = panel
        .departamentos()
        .filter(|d| !is_canonical(d))
        .map(str::to_string)
        .collect();

    if unmatched.is_empty() {
        return Ok(unmatched);
    }

    match policy {
        UnmatchedRegionPolicy::Passthrough => {
            warn!(?unmatched, "sales departamentos outside the canonical set, joins will be empty");
            Ok(unmatched)
        }
        UnmatchedRegionPolicy::Reject => Err(EnrichError::UnmatchedRegion {
            table: "ventas".to_string(),
            values: unmatched,
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::read_panel;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Serves bodies by URL, unknown URLs fail like a refused connection
    struct FakeFetcher {
        resources: HashMap<&'static str, Vec<u8>>,
    }

    impl Fetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.resources
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("connection refused: {}", url))
        }
    }

    fn config(output: &Path) -> PipelineConfig {
        PipelineConfig {
            ventas_url: "mem://ventas".to_string(),
            poblacion_url: "mem://poblacion".to_string(),
            empresas_url: "mem://empresas".to_string(),
            output_path: output.display().to_string(),
            unmatched_regions: UnmatchedRegionPolicy::Passthrough,
        }
    }

    #[test]
    fn test_fetch_failure_aborts_without_output() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("panel.csv");
        let fetcher = FakeFetcher {
            resources: HashMap::new(),
        };

        let err = run(&config(&out), &fetcher).unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(!out.exists());
    }

    #[test]
    fn test_spreadsheet_decode_failure_aborts() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("panel.csv");
        let mut resources = HashMap::new();
        resources.insert("mem://ventas", b"Departamento,monto\nrocha,10\n".to_vec());
        resources.insert("mem://poblacion", b"departamento,poblacion\nRocha,68088\n".to_vec());
        resources.insert("mem://empresas", b"not a workbook".to_vec());
        let fetcher = FakeFetcher { resources };

        assert!(run(&config(&out), &fetcher).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_summary_lists_source_counts() {
        let started_at = Utc::now();
        let report = RunReport {
            started_at,
            finished_at: started_at,
            ventas_rows: 3000,
            poblacion_departamentos: 19,
            empresas_departamentos: 18,
            panel_rows: 19,
            unmatched_regions: vec![],
            output_path: PathBuf::from("panel.csv"),
        };
        assert_eq!(
            report.summary(),
            "3000 ventas rows, 19 población / 18 empresas departamentos → 19 departamentos (0 unmatched) in 0 ms"
        );
    }

    #[test]
    fn test_check_unmatched_policies() {
        let panel = RegionalPanel::new(vec![
            sample_row("MONTEVIDEO"),
            sample_row("BUENOS AIRES"),
        ]);

        let unmatched = check_unmatched(&panel, UnmatchedRegionPolicy::Passthrough).unwrap();
        assert_eq!(unmatched, vec!["BUENOS AIRES".to_string()]);

        let err = check_unmatched(&panel, UnmatchedRegionPolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            EnrichError::UnmatchedRegion {
                table: "ventas".to_string(),
                values: vec!["BUENOS AIRES".to_string()],
            }
        );

        let clean = RegionalPanel::new(vec![sample_row("ROCHA")]);
        assert!(check_unmatched(&clean, UnmatchedRegionPolicy::Reject).unwrap().is_empty());
    }

    #[test]
    fn test_enrich_then_write_round_trip() {
        use crate::sources::{empresas_from_table, poblacion_from_table};
        use crate::table::Table;

        let dir = tempdir().unwrap();
        let out = dir.path().join("panel.csv");

        let ventas = Table::from_csv_bytes(
            "ventas",
            b"Departamento,monto\nmontevideo,100\nMONTEVIDEO,50\ncanelones,200\n",
        )
        .unwrap();
        let poblacion = poblacion_from_table(
            &Table::from_csv_bytes("poblacion", b"departamento,poblacion\nMontevideo,1000\nCanelones,500\n")
                .unwrap(),
        )
        .unwrap();
        let empresas = empresas_from_table(&Table::from_rows(
            "empresas",
            &["Departamento"],
            (0..10).map(|_| vec![Some("Montevideo")]).collect(),
        ))
        .unwrap();

        let panel = enrich(ventas, poblacion, empresas).unwrap();
        write_panel(&panel, &out).unwrap();
        let back = read_panel(&out).unwrap();

        assert_eq!(back.len(), 2);
        let can = back.row("CANELONES").unwrap();
        assert_eq!(can.empresas, Some(0));
        assert!((can.intensidad_mercado - 0.4).abs() < 1e-9);
        let mvd = back.row("MONTEVIDEO").unwrap();
        assert_eq!(mvd.empresas, Some(10));
        assert!((mvd.intensidad_mercado - 0.15).abs() < 1e-9);
    }

    fn sample_row(depto: &str) -> crate::panel::PanelRow {
        crate::panel::PanelRow {
            departamento: depto.to_string(),
            ventas_total: 1.0,
            operaciones: 1,
            ticket_promedio: 1.0,
            poblacion: None,
            empresas: Some(0),
            intensidad_mercado: f64::NAN,
            z_pop: f64::NAN,
            z_emp: f64::NAN,
            nivel_desarrollo_regional: f64::NAN,
        }
    }
}
