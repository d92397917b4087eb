use serde::Serialize;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::columns::ColumnMapping;
use crate::cycles::{self, Classified, Cycle, CycleKind, CycleSelection, CycleSet};
use crate::error::{FcpError, Result};
use crate::table::{Field, Table};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Process-wide stamp; no two loaded or transformed tables share one.
fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// A table with its resolved column mapping.
///
/// Transforms consume the dataset and hand back a new one with a fresh
/// generation whenever data changes. A [`CycleSet`] remembers the generation
/// it was computed from and is refused by any other dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    table: Table,
    mapping: ColumnMapping,
    generation: u64,
}

impl Dataset {
    pub fn new(table: Table, mapping: ColumnMapping) -> Result<Self> {
        mapping.validate(table.arity())?;
        Ok(Self {
            table,
            mapping,
            generation: next_generation(),
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Full column for a canonical field.
    pub fn column(&self, field: Field) -> &[f64] {
        self.table
            .column(self.mapping.index(field))
            .unwrap_or_default()
    }

    fn no_activity(&self, threshold: f64) -> FcpError {
        FcpError::NoActivity {
            file: self.name().to_string(),
            threshold,
        }
    }

    pub fn detect_first_active_row(&self, threshold: f64) -> Result<usize> {
        cycles::first_active_row(self.column(Field::Current), threshold)
            .ok_or_else(|| self.no_activity(threshold))
    }

    /// Drop rows before the first active row. A no-op when row 0 is active.
    pub fn trim_to_active(self, threshold: f64) -> Result<Self> {
        let first = self.detect_first_active_row(threshold)?;
        if first == 0 {
            return Ok(self);
        }
        Ok(Self {
            table: self.table.drop_leading_rows(first),
            mapping: self.mapping,
            generation: next_generation(),
        })
    }

    /// Shift time so the first row reads zero.
    pub fn normalize_time(self) -> Self {
        let Some(&origin) = self.column(Field::Time).first() else {
            return self;
        };
        let idx = self.mapping.time;
        Self {
            table: self.table.map_column(idx, |t| t - origin),
            mapping: self.mapping,
            generation: next_generation(),
        }
    }

    pub fn compute_cycles(&self, threshold: f64) -> Result<CycleSet> {
        let cycles = cycles::segment(self.column(Field::Current), threshold)
            .ok_or_else(|| self.no_activity(threshold))?;
        Ok(CycleSet {
            generation: self.generation,
            cycles,
        })
    }

    fn check_fresh(&self, set: &CycleSet) -> Result<()> {
        if set.generation != self.generation {
            return Err(FcpError::StaleCycles {
                computed: set.generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    pub fn classify(&self, set: &CycleSet) -> Result<Classified> {
        self.check_fresh(set)?;
        Ok(cycles::partition(self.column(Field::Current), set.cycles()))
    }

    /// Kind of every cycle, in chronological order.
    pub fn kinds(&self, set: &CycleSet) -> Result<Vec<CycleKind>> {
        self.check_fresh(set)?;
        let current = self.column(Field::Current);
        Ok(set
            .cycles()
            .iter()
            .map(|cycle| cycles::kind_of(current, cycle))
            .collect())
    }

    /// Resolve a selection to 1-based chronological cycle numbers.
    pub fn select(&self, selection: &CycleSelection, set: &CycleSet) -> Result<Vec<usize>> {
        let classified = self.classify(set)?;
        selection.resolve(set.cycles(), &classified.discharge, &classified.charge)
    }

    /// Values of `field`, restricted to `rows` when given.
    pub fn extract(&self, field: Field, rows: Option<Range<usize>>) -> Result<Vec<f64>> {
        let column = self.column(field);
        match rows {
            None => Ok(column.to_vec()),
            Some(range) if range.start <= range.end && range.end <= column.len() => {
                Ok(column[range].to_vec())
            }
            Some(range) => Err(FcpError::CycleRange {
                kind: "Row range end",
                requested: range.end as i64,
                available: column.len(),
            }),
        }
    }

    /// Values of `field` over one cycle of a fresh cycle set.
    pub fn extract_cycle(&self, field: Field, set: &CycleSet, cycle: &Cycle) -> Result<Vec<f64>> {
        self.check_fresh(set)?;
        self.extract(field, Some(cycle.range()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::DEFAULT_ACTIVITY_THRESHOLD;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn dataset(time: Vec<f64>, current: Vec<f64>) -> Dataset {
        let n = time.len();
        let headers: Vec<String> = ["cycle", "time", "ewe", "q", "i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let potential: Vec<f64> = (0..n).map(|i| 3.0 + i as f64 * 0.01).collect();
        let capacity: Vec<f64> = (0..n).map(|i| i as f64 * 0.5).collect();
        let columns = vec![vec![1.0; n], time, potential, capacity, current];
        let table = Table::from_columns("cell.txt", headers, columns).unwrap();
        Dataset::new(table, ColumnMapping::INSTRUMENT_EXPORT).unwrap()
    }

    fn scenario() -> Dataset {
        dataset(
            (0..8).map(|i| 100.0 + i as f64 * 10.0).collect(),
            vec![0.0, 0.0, 1.0, 1.0, -1.0, -1.0, -1.0, 2.0],
        )
    }

    #[test]
    fn trim_then_normalize_starts_at_zero() {
        let data = scenario()
            .trim_to_active(DEFAULT_ACTIVITY_THRESHOLD)
            .unwrap()
            .normalize_time();
        assert_eq!(data.row_count(), 6);
        assert_eq!(data.column(Field::Time)[0], 0.0);
        assert_eq!(data.column(Field::Time)[5], 50.0);
        assert_eq!(data.column(Field::Current)[0], 1.0);
    }

    #[test]
    fn trim_is_idempotent() {
        let once = scenario().trim_to_active(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        let twice = once.clone().trim_to_active(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.detect_first_active_row(DEFAULT_ACTIVITY_THRESHOLD).unwrap(), 0);
    }

    #[test]
    fn inactive_current_is_no_activity_error() {
        let data = dataset(vec![0.0, 1.0, 2.0], vec![0.0, 5e-7, -1e-6]);
        let err = data.detect_first_active_row(DEFAULT_ACTIVITY_THRESHOLD).unwrap_err();
        assert!(matches!(err, FcpError::NoActivity { .. }));
        assert!(err.to_string().contains("cell.txt"));
        assert!(data.clone().trim_to_active(DEFAULT_ACTIVITY_THRESHOLD).is_err());
        assert!(data.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).is_err());
    }

    #[test]
    fn stale_cycles_are_rejected() {
        let data = scenario();
        let set = data.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        assert!(data.classify(&set).is_ok());
        let before = data.generation();
        let data = data.normalize_time();
        let err = data.classify(&set).unwrap_err();
        assert!(matches!(
            err,
            FcpError::StaleCycles { computed, current }
                if computed == before && current == data.generation()
        ));
        let cycle = set.get(1).unwrap();
        assert!(data.extract_cycle(Field::Time, &set, &cycle).is_err());
    }

    #[test]
    fn sibling_transforms_do_not_share_cycles() {
        let base = scenario();
        let normalized = base.clone().normalize_time();
        let trimmed = base.trim_to_active(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        assert_ne!(normalized.generation(), trimmed.generation());
        let set = normalized.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        let cycle = set.get(1).unwrap();
        let err = trimmed.extract_cycle(Field::Time, &set, &cycle).unwrap_err();
        assert!(matches!(err, FcpError::StaleCycles { .. }));
    }

    #[test]
    fn cycles_from_another_file_are_rejected() {
        let a = scenario();
        let b = dataset(
            (0..6).map(|i| i as f64).collect(),
            vec![-1.0, -1.0, 1.0, 1.0, 1.0, -1.0],
        );
        let set_a = a.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        assert!(matches!(
            b.classify(&set_a).unwrap_err(),
            FcpError::StaleCycles { .. }
        ));
        assert!(b.kinds(&set_a).is_err());
        assert!(b.select(&CycleSelection::All, &set_a).is_err());
    }

    #[test]
    fn clones_keep_their_cycles() {
        let data = scenario();
        let set = data.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        assert_eq!(data.clone().kinds(&set).unwrap().len(), 2);
    }

    #[test]
    fn select_maps_kind_position_to_chronological_number() {
        let data = scenario();
        let set = data.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
        assert_eq!(
            data.select(&CycleSelection::Discharge(1), &set).unwrap(),
            vec![2]
        );
        assert_eq!(
            data.kinds(&set).unwrap(),
            vec![CycleKind::Charge, CycleKind::Discharge]
        );
    }

    #[test]
    fn extract_restricts_to_range() {
        let data = scenario();
        assert_eq!(data.extract(Field::Current, None).unwrap().len(), 8);
        assert_eq!(
            data.extract(Field::Current, Some(4..7)).unwrap(),
            vec![-1.0, -1.0, -1.0]
        );
        assert!(data.extract(Field::Current, Some(4..9)).is_err());
    }

    #[test]
    fn trimming_shifts_boundaries_by_offset() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let len = rng.gen_range(3..40);
            let current: Vec<f64> = (0..len)
                .map(|_| match rng.gen_range(0..3) {
                    0 => 0.0,
                    1 => 1.0,
                    _ => -1.0,
                })
                .collect();
            let data = dataset((0..len).map(|i| i as f64).collect(), current);
            let Ok(offset) = data.detect_first_active_row(DEFAULT_ACTIVITY_THRESHOLD) else {
                continue;
            };
            let before = data.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
            let trimmed = data.trim_to_active(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
            let after = trimmed.compute_cycles(DEFAULT_ACTIVITY_THRESHOLD).unwrap();
            let shifted: Vec<Cycle> = before
                .cycles()
                .iter()
                .map(|c| Cycle {
                    start: c.start - offset,
                    end: c.end - offset,
                })
                .collect();
            assert_eq!(after.cycles(), shifted.as_slice());
        }
    }
}
