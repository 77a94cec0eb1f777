// ⚙️ Pipeline configuration
// Public dataset locations and run options. Defaults reproduce the standard run.

use serde::{Deserialize, Serialize};

/// Sales transactions (delimited text)
pub const VENTAS_URL_DEFAULT: &str =
    "https://raw.githubusercontent.com/Gonrampsn4/Proyecto-Ciencia-de-Datos2-Ventas_Ramallo/main/dataset_ventas_3000.csv";

/// Population per departamento (delimited text, catalogodatos.gub.uy)
pub const POBLACION_URL: &str =
    "https://catalogodatos.gub.uy/dataset/7e7c97c8-a7cc-4f1f-9c85-a2c25ae28141/resource/5e1cf37b-201e-43b7-a5ba-66ee0e64e4d0/download/datosbasicosjds.csv";

/// Business registry (XLSX, catalogodatos.gub.uy)
pub const EMPRESAS_XLSX_URL: &str =
    "https://catalogodatos.gub.uy/dataset/575ccb87-ae74-4dcd-ba4b-cf050bd8e08a/resource/e8e6f2e4-357e-4027-b91a-407b5d5501f7/download/empresasdei_20230330.xlsx";

pub const OUTPUT_PATH_DEFAULT: &str = "ventas_enriquecidas_uy.csv";

/// What to do with region names outside the 19 departamentos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnmatchedRegionPolicy {
    /// Keep them (trimmed, uppercased); their joins come back empty
    #[default]
    Passthrough,
    /// Abort the run listing the offending names
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ventas_url: String,
    pub poblacion_url: String,
    pub empresas_url: String,
    pub output_path: String,
    pub unmatched_regions: UnmatchedRegionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            ventas_url: VENTAS_URL_DEFAULT.to_string(),
            poblacion_url: POBLACION_URL.to_string(),
            empresas_url: EMPRESAS_XLSX_URL.to_string(),
            output_path: OUTPUT_PATH_DEFAULT.to_string(),
            unmatched_regions: UnmatchedRegionPolicy::Passthrough,
        }
    }
}

impl PipelineConfig {
    /// Builder pattern: override the sales source
    pub fn with_ventas_url(mut self, url: impl Into<String>) -> Self {
        self.ventas_url = url.into();
        self
    }

    /// Builder pattern: override the output file
    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_unmatched_regions(mut self, policy: UnmatchedRegionPolicy) -> Self {
        self.unmatched_regions = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_path, "ventas_enriquecidas_uy.csv");
        assert_eq!(config.unmatched_regions, UnmatchedRegionPolicy::Passthrough);
        assert!(config.empresas_url.ends_with(".xlsx"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::default()
            .with_ventas_url("http://localhost/ventas.csv")
            .with_output_path("/tmp/panel.csv");

        assert_eq!(config.ventas_url, "http://localhost/ventas.csv");
        assert_eq!(config.output_path, "/tmp/panel.csv");
        assert_eq!(config.poblacion_url, POBLACION_URL);
    }
}
