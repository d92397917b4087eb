//! Mapping of raw instrument headers onto canonical fields.

use serde::{Deserialize, Serialize};

use crate::error::{FcpError, Result};
use crate::table::Field;

/// Substring patterns per field, tried in order against lower-cased headers.
pub const FIELD_PATTERNS: [(Field, &[&str]); 4] = [
    (Field::Time, &["time", "time/s", "time (s)"]),
    (
        Field::Potential,
        &["ewe", "potential", "e/v", "potential (v)", "ewe/v"],
    ),
    (
        Field::Capacity,
        &["capacity", "q charge", "capacity/ma.h", "capacity (mah)"],
    ),
    (Field::Current, &["i", "current", "i/ma", "current (ma)"]),
];

/// Pattern for the optional cycle-number column.
pub const CYCLE_PATTERN: &str = "cycle";

/// Zero-based column positions of the canonical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub time: usize,
    pub potential: usize,
    pub capacity: usize,
    pub current: usize,
    #[serde(default)]
    pub cycle: Option<usize>,
}

impl ColumnMapping {
    /// Column order of the raw tab-separated instrument export:
    /// cycle number, time (s), potential (V), capacity (mAh), current (mA).
    pub const INSTRUMENT_EXPORT: ColumnMapping = ColumnMapping {
        cycle: Some(0),
        time: 1,
        potential: 2,
        capacity: 3,
        current: 4,
    };

    pub fn index(&self, field: Field) -> usize {
        match field {
            Field::Time => self.time,
            Field::Potential => self.potential,
            Field::Capacity => self.capacity,
            Field::Current => self.current,
        }
    }

    /// Check every position is addressable in a table of `arity` columns.
    pub fn validate(&self, arity: usize) -> Result<()> {
        let positions = Field::ALL
            .iter()
            .map(|field| self.index(*field))
            .chain(self.cycle);
        for index in positions {
            if index >= arity {
                return Err(FcpError::InvalidMapping { index, arity });
            }
        }
        Ok(())
    }
}

/// Strategy for turning a header row into a [`ColumnMapping`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnResolver {
    /// Known column order; headers are not consulted.
    Fixed(ColumnMapping),
    /// Case-insensitive substring matching against [`FIELD_PATTERNS`].
    Patterns,
}

impl Default for ColumnResolver {
    fn default() -> Self {
        ColumnResolver::Fixed(ColumnMapping::INSTRUMENT_EXPORT)
    }
}

impl ColumnResolver {
    /// Whether the source file's first line is a header row.
    pub fn reads_header(&self) -> bool {
        matches!(self, ColumnResolver::Patterns)
    }

    pub fn resolve(&self, headers: &[String]) -> Result<ColumnMapping> {
        match self {
            ColumnResolver::Fixed(mapping) => {
                mapping.validate(headers.len())?;
                Ok(*mapping)
            }
            ColumnResolver::Patterns => resolve_by_patterns(headers),
        }
    }
}

/// Bind fields in table order; first pattern then first unclaimed header wins.
pub fn resolve_by_patterns(headers: &[String]) -> Result<ColumnMapping> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut claimed = vec![false; lowered.len()];
    let mut bound: [Option<usize>; 4] = [None; 4];

    for (slot, (_, patterns)) in bound.iter_mut().zip(FIELD_PATTERNS.iter()) {
        *slot = find_unclaimed(&lowered, &claimed, patterns);
        if let Some(idx) = *slot {
            claimed[idx] = true;
        }
    }

    let missing: Vec<String> = FIELD_PATTERNS
        .iter()
        .zip(bound.iter())
        .filter(|(_, slot)| slot.is_none())
        .map(|((field, _), _)| field.name().to_string())
        .collect();
    match bound {
        [Some(time), Some(potential), Some(capacity), Some(current)] => {
            let cycle = find_unclaimed(&lowered, &claimed, &[CYCLE_PATTERN]);
            Ok(ColumnMapping {
                time,
                potential,
                capacity,
                current,
                cycle,
            })
        }
        _ => Err(FcpError::ColumnResolution {
            missing,
            headers: headers.to_vec(),
        }),
    }
}

fn find_unclaimed(lowered: &[String], claimed: &[bool], patterns: &[&str]) -> Option<usize> {
    patterns.iter().find_map(|pattern| {
        lowered
            .iter()
            .zip(claimed)
            .position(|(header, taken)| !taken && header.contains(pattern))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_biologic_style_headers() {
        let mapping = resolve_by_patterns(&headers(&["Ewe/V", "time/s", "Q charge/mA.h", "I/mA"]))
            .unwrap();
        assert_eq!(mapping.potential, 0);
        assert_eq!(mapping.time, 1);
        assert_eq!(mapping.capacity, 2);
        assert_eq!(mapping.current, 3);
        assert_eq!(mapping.cycle, None);
    }

    #[test]
    fn resolves_verbose_headers_and_optional_cycle() {
        let mapping = resolve_by_patterns(&headers(&[
            "Cycle Number",
            " Time (s) ",
            "Potential (V)",
            "Capacity (mAh)",
            "Current (mA)",
        ]))
        .unwrap();
        assert_eq!(mapping, ColumnMapping::INSTRUMENT_EXPORT);
    }

    #[test]
    fn first_pattern_wins_over_later_header() {
        // "potential" comes before "e/v" in the pattern list, so the second
        // column is preferred even though the first also matches a pattern.
        let mapping = resolve_by_patterns(&headers(&[
            "time",
            "E/V",
            "Potential",
            "capacity",
            "current",
        ]))
        .unwrap();
        assert_eq!(mapping.potential, 2);
        // No unclaimed header contains "i", so "current" binds instead.
        assert_eq!(mapping.current, 4);
    }

    #[test]
    fn broad_current_pattern_takes_leftmost_unclaimed_match() {
        let mapping = resolve_by_patterns(&headers(&[
            "time/s",
            "Ewe/V",
            "Capacity/mA.h",
            "Cell ID",
            "I/mA",
        ]))
        .unwrap();
        assert_eq!(mapping.current, 3);
    }

    #[test]
    fn missing_fields_are_reported_with_headers() {
        let err = resolve_by_patterns(&headers(&[" Time/s", "Ewe/V"])).unwrap_err();
        match err {
            FcpError::ColumnResolution { missing, headers } => {
                assert_eq!(missing, vec!["capacity", "current"]);
                assert_eq!(headers, vec![" Time/s", "Ewe/V"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn fixed_resolver_skips_headers_but_checks_arity() {
        let resolver = ColumnResolver::default();
        assert!(!resolver.reads_header());
        let five = headers(&["a", "b", "c", "d", "e"]);
        assert_eq!(
            resolver.resolve(&five).unwrap(),
            ColumnMapping::INSTRUMENT_EXPORT
        );
        let err = resolver.resolve(&five[..4]).unwrap_err();
        assert!(matches!(
            err,
            FcpError::InvalidMapping { index: 4, arity: 4 }
        ));
        assert!(ColumnResolver::Patterns.reads_header());
    }
}
