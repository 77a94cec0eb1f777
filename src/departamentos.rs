// 🗺️ Departamento Normalizer - closed set of regions + alias table
//
// Problem solved:
// - "San Jose", "SAN JOSÉ", "SAN JOSÃ‰" → all the same departamento
// - Sources disagree on accents, casing and text encoding
// - Unknown names pass through (trimmed, uppercased) instead of failing

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// DEPARTAMENTO
// ============================================================================

/// The 19 departamentos of Uruguay, the canonical join key of every table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Departamento {
    Artigas,
    Canelones,
    CerroLargo,
    Colonia,
    Durazno,
    Flores,
    Florida,
    Lavalleja,
    Maldonado,
    Montevideo,
    Paysandu,
    RioNegro,
    Rivera,
    Rocha,
    Salto,
    SanJose,
    Soriano,
    Tacuarembo,
    TreintaYTres,
}

impl Departamento {
    pub const ALL: [Departamento; 19] = [
        Departamento::Artigas,
        Departamento::Canelones,
        Departamento::CerroLargo,
        Departamento::Colonia,
        Departamento::Durazno,
        Departamento::Flores,
        Departamento::Florida,
        Departamento::Lavalleja,
        Departamento::Maldonado,
        Departamento::Montevideo,
        Departamento::Paysandu,
        Departamento::RioNegro,
        Departamento::Rivera,
        Departamento::Rocha,
        Departamento::Salto,
        Departamento::SanJose,
        Departamento::Soriano,
        Departamento::Tacuarembo,
        Departamento::TreintaYTres,
    ];

    /// Canonical accented, uppercase spelling used in every output table
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Departamento::Artigas => "ARTIGAS",
            Departamento::Canelones => "CANELONES",
            Departamento::CerroLargo => "CERRO LARGO",
            Departamento::Colonia => "COLONIA",
            Departamento::Durazno => "DURAZNO",
            Departamento::Flores => "FLORES",
            Departamento::Florida => "FLORIDA",
            Departamento::Lavalleja => "LAVALLEJA",
            Departamento::Maldonado => "MALDONADO",
            Departamento::Montevideo => "MONTEVIDEO",
            Departamento::Paysandu => "PAYSANDÚ",
            Departamento::RioNegro => "RÍO NEGRO",
            Departamento::Rivera => "RIVERA",
            Departamento::Rocha => "ROCHA",
            Departamento::Salto => "SALTO",
            Departamento::SanJose => "SAN JOSÉ",
            Departamento::Soriano => "SORIANO",
            Departamento::Tacuarembo => "TACUAREMBÓ",
            Departamento::TreintaYTres => "TREINTA Y TRES",
        }
    }

    /// Alternative spellings seen in the public datasets.
    ///
    /// Covers the unaccented form, decomposed accents (letter + U+0301),
    /// UTF-8 bytes decoded as Windows-1252 / Latin-1, and Latin-1 bytes
    /// decoded as UTF-8 (replacement character). Keys are uppercased when the
    /// lookup table is built, so mixed case here is fine.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Departamento::Paysandu => &[
                "PAYSANDU",
                "PAYSANDU\u{301}",
                "PAYSANDÃš",
                "PAYSANDÃ\u{9a}",
                "PAYSAND\u{fffd}",
            ],
            Departamento::RioNegro => &[
                "RIO NEGRO",
                "RI\u{301}O NEGRO",
                "RÃ\u{8d}O NEGRO",
                "R\u{fffd}O NEGRO",
                "RIONEGRO",
            ],
            Departamento::SanJose => &[
                "SAN JOSE",
                "SAN JOSE\u{301}",
                "SAN JOSÃ‰",
                "SAN JOSÃ\u{89}",
                "SAN JOS\u{fffd}",
            ],
            Departamento::Tacuarembo => &[
                "TACUAREMBO",
                "TACUAREMBO\u{301}",
                "TACUAREMBÃ“",
                "TACUAREMBÃ\u{93}",
                "TACUAREMB\u{fffd}",
            ],
            _ => &[],
        }
    }

    /// Resolve any spelling to a departamento, None when outside the set
    pub fn resolve(raw: &str) -> Option<Departamento> {
        ALIAS_TABLE.get(&lookup_key(raw)).copied()
    }
}

impl fmt::Display for Departamento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

// ============================================================================
// ALIAS TABLE
// ============================================================================

/// Uppercased spelling → departamento. Built once, never mutated.
static ALIAS_TABLE: Lazy<HashMap<String, Departamento>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for depto in Departamento::ALL {
        table.insert(lookup_key(depto.canonical_name()), depto);
        for alias in depto.aliases() {
            table.insert(lookup_key(alias), depto);
        }
    }
    table
});

fn lookup_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Canonicalize a departamento name.
///
/// Known spellings map to the canonical accented form. Anything else comes
/// back trimmed and uppercased, so it silently fails to join downstream.
pub fn normalize_depto(raw: &str) -> String {
    let key = lookup_key(raw);
    match ALIAS_TABLE.get(&key) {
        Some(depto) => depto.canonical_name().to_string(),
        None => key,
    }
}

/// Cell-level variant: missing stays missing, blank counts as missing
pub fn normalize_cell(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }
    Some(normalize_depto(raw))
}

/// True when a (normalized) name belongs to the canonical set
pub fn is_canonical(name: &str) -> bool {
    Departamento::ALL.iter().any(|d| d.canonical_name() == name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_map_to_themselves() {
        for depto in Departamento::ALL {
            assert_eq!(normalize_depto(depto.canonical_name()), depto.canonical_name());
        }
    }

    #[test]
    fn test_case_and_whitespace_variants() {
        assert_eq!(normalize_depto("montevideo"), "MONTEVIDEO");
        assert_eq!(normalize_depto("  Montevideo \t"), "MONTEVIDEO");
        assert_eq!(normalize_depto("treinta y tres"), "TREINTA Y TRES");
        assert_eq!(normalize_depto("Cerro Largo "), "CERRO LARGO");
    }

    #[test]
    fn test_accent_variants() {
        assert_eq!(normalize_depto("San Jose"), "SAN JOSÉ");
        assert_eq!(normalize_depto("san josé"), "SAN JOSÉ");
        assert_eq!(normalize_depto("Rio Negro"), "RÍO NEGRO");
        assert_eq!(normalize_depto("paysandu"), "PAYSANDÚ");
        assert_eq!(normalize_depto("Tacuarembo"), "TACUAREMBÓ");
        assert_eq!(normalize_depto("SAN JOSE\u{301}"), "SAN JOSÉ");
    }

    #[test]
    fn test_mis_encoded_variants() {
        assert_eq!(normalize_depto("SAN JOSÃ‰"), "SAN JOSÉ");
        assert_eq!(normalize_depto("Paysandãš"), "PAYSANDÚ");
        assert_eq!(normalize_depto("TACUAREMBÃ“"), "TACUAREMBÓ");
        assert_eq!(normalize_depto("RÃ\u{8d}O NEGRO"), "RÍO NEGRO");
        assert_eq!(normalize_depto("SAN JOS\u{fffd}"), "SAN JOSÉ");
    }

    #[test]
    fn test_unknown_names_pass_through() {
        assert_eq!(normalize_depto("  buenos aires "), "BUENOS AIRES");
        assert_eq!(normalize_depto("Total País"), "TOTAL PAÍS");
        assert!(!is_canonical(&normalize_depto("buenos aires")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "montevideo",
            "San Jose",
            "PAYSANDÃš",
            "  rio negro",
            "buenos aires",
            "",
            "Straße",
        ];
        for raw in inputs {
            let once = normalize_depto(raw);
            assert_eq!(normalize_depto(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_normalize_cell_missing_passthrough() {
        assert_eq!(normalize_cell(None), None);
        assert_eq!(normalize_cell(Some("   ")), None);
        assert_eq!(normalize_cell(Some("rocha")), Some("ROCHA".to_string()));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Departamento::resolve("flores"), Some(Departamento::Flores));
        assert_eq!(Departamento::resolve("Rio Negro"), Some(Departamento::RioNegro));
        assert_eq!(Departamento::resolve("Córdoba"), None);
        assert_eq!(Departamento::SanJose.to_string(), "SAN JOSÉ");
    }
}
