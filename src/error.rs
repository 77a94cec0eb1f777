// ⚠️ Error taxonomy
// Typed failures of the enrichment core. I/O boundaries wrap these in anyhow.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnrichError {
    /// A required semantic role matched no header in the source table
    #[error("column not found for {role} in {source_name} (columns: {columns:?})")]
    ColumnNotFound {
        role: String,
        source_name: String,
        columns: Vec<String>,
    },

    /// Region names outside the canonical set, only raised under the Reject policy
    #[error("unmatched region names in {table}: {values:?}")]
    UnmatchedRegion { table: String, values: Vec<String> },
}

pub type Result<T> = std::result::Result<T, EnrichError>;
