// 🔎 Column Discovery - find the column that plays a semantic role
// Sources name their columns differently; roles are matched by keywords.

use crate::error::{EnrichError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// ROLES
// ============================================================================

/// How a keyword is compared against a header (always case-insensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Header contains the keyword
    Substring,
    /// Header equals the keyword
    Exact,
}

/// Semantic role a column can play in a source table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Departamento key in the population and business sources
    Region,
    /// Departamento key in the sales source (exact header names only)
    SalesRegion,
    /// Monetary amount of a sale
    Amount,
    /// Population count
    Population,
}

impl ColumnRole {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnRole::Region => "region",
            ColumnRole::SalesRegion => "sales region",
            ColumnRole::Amount => "amount",
            ColumnRole::Population => "population",
        }
    }

    /// Lowercase keywords in priority order
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ColumnRole::Region => &["depar", "departamento"],
            ColumnRole::SalesRegion => &["departamento", "depto", "region", "provincia", "estado"],
            ColumnRole::Amount => &[
                "monto", "importe", "total", "venta", "revenue", "price", "amount",
            ],
            ColumnRole::Population => &["poblac", "habit"],
        }
    }

    pub fn match_mode(&self) -> MatchMode {
        match self {
            ColumnRole::SalesRegion => MatchMode::Exact,
            _ => MatchMode::Substring,
        }
    }

    /// Discover this role's column in a header list
    pub fn find(&self, source_name: &str, headers: &[String]) -> Result<ColumnMatch> {
        find_column(headers, self.keywords(), self.match_mode()).ok_or_else(|| {
            EnrichError::ColumnNotFound {
                role: self.name().to_string(),
                source_name: source_name.to_string(),
                columns: headers.to_vec(),
            }
        })
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Result of a successful discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMatch {
    /// Position in the original header order
    pub index: usize,
    pub header: String,
    /// Highest-priority keyword that matched this header
    pub keyword: &'static str,
}

/// Find the first header (in original order) matching any keyword.
///
/// Column order decides: a later header never wins over an earlier one, even
/// if it matches a higher-priority keyword. `keyword` reports the first
/// keyword, in priority order, that the winning header matched.
pub fn find_column(
    headers: &[String],
    keywords: &[&'static str],
    mode: MatchMode,
) -> Option<ColumnMatch> {
    headers.iter().enumerate().find_map(|(index, header)| {
        let lower = header.to_lowercase();
        keywords
            .iter()
            .find(|k| match mode {
                MatchMode::Substring => lower.contains(*k),
                MatchMode::Exact => lower == **k,
            })
            .map(|keyword| ColumnMatch {
                index,
                header: header.clone(),
                keyword: *keyword,
            })
    })
}

// ============================================================================
// TESTS
// ============================================================================
