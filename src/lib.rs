// UY Enrichment - Core Library
// Ventas + población + empresas → panel regional por departamento

pub mod columns;
pub mod config;
pub mod departamentos;
pub mod enrichment;
pub mod error;
pub mod logging;
pub mod panel;
pub mod pipeline;
pub mod sources;
pub mod table;

// Re-export commonly used types
pub use columns::{find_column, ColumnMatch, ColumnRole, MatchMode};
pub use config::{PipelineConfig, UnmatchedRegionPolicy};
pub use departamentos::{normalize_cell, normalize_depto, Departamento};
pub use enrichment::{
    enrich, summarize_ventas, zscore, JoinSpec, MissingPolicy, RegionalSalesSummary,
    EMPRESAS_JOIN, POBLACION_JOIN,
};
pub use error::EnrichError;
pub use panel::{read_panel, write_panel, PanelRow, RegionalPanel};
pub use pipeline::{run, RunReport};
pub use sources::{
    load_empresas, load_poblacion, load_ventas, BusinessCountTable, Fetcher, HttpFetcher,
    PopulationTable,
};
pub use table::Table;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
