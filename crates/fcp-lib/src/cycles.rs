//! Segmentation of a current trace into charge/discharge half-cycles.

use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{FcpError, Result};

/// Absolute current (mA) above which a row counts as active.
pub const DEFAULT_ACTIVITY_THRESHOLD: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    Discharge,
    Charge,
}

/// Half-open row range `[start, end)` of one same-signed run of current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub start: usize,
    pub end: usize,
}

impl Cycle {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Cycles computed from one generation of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSet {
    pub(crate) generation: u64,
    pub(crate) cycles: Vec<Cycle>,
}

impl CycleSet {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Look up a 1-based chronological cycle number.
    pub fn get(&self, number: usize) -> Result<Cycle> {
        number
            .checked_sub(1)
            .and_then(|idx| self.cycles.get(idx))
            .copied()
            .ok_or(FcpError::CycleRange {
                kind: "Cycle",
                requested: number as i64,
                available: self.cycles.len(),
            })
    }
}

/// Cycles split by kind, each list in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classified {
    pub discharge: Vec<Cycle>,
    pub charge: Vec<Cycle>,
}

impl Classified {
    pub fn total(&self) -> usize {
        self.discharge.len() + self.charge.len()
    }
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Index of the first row with `|current| > threshold`.
pub fn first_active_row(current: &[f64], threshold: f64) -> Option<usize> {
    current.iter().position(|value| value.abs() > threshold)
}

/// Cycle boundaries starting at `first`: every row whose sign differs from
/// the previous row, closed by the last row index. Strictly increasing.
pub fn boundaries(current: &[f64], first: usize) -> Vec<usize> {
    let mut out = vec![first];
    if current.is_empty() {
        return out;
    }
    for i in first..current.len() - 1 {
        if sign(current[i]) != sign(current[i + 1]) {
            out.push(i + 1);
        }
    }
    let last = current.len() - 1;
    if out.last() != Some(&last) {
        out.push(last);
    }
    out
}

/// Cycles between consecutive boundaries, or `None` when nothing is active.
pub fn segment(current: &[f64], threshold: f64) -> Option<Vec<Cycle>> {
    let first = first_active_row(current, threshold)?;
    let cycles = boundaries(current, first)
        .windows(2)
        .map(|w| Cycle {
            start: w[0],
            end: w[1],
        })
        .collect();
    Some(cycles)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Negative mean current is a discharge; zero or positive is a charge.
pub fn kind_of(current: &[f64], cycle: &Cycle) -> CycleKind {
    let end = cycle.end.min(current.len());
    let start = cycle.start.min(end);
    if mean(&current[start..end]) < 0.0 {
        CycleKind::Discharge
    } else {
        CycleKind::Charge
    }
}

pub fn partition(current: &[f64], cycles: &[Cycle]) -> Classified {
    let mut out = Classified::default();
    for cycle in cycles {
        match kind_of(current, cycle) {
            CycleKind::Discharge => out.discharge.push(*cycle),
            CycleKind::Charge => out.charge.push(*cycle),
        }
    }
    out
}

/// Parsed cycle specification: `all`, `N`, `discharge K` or `charge K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleSelection {
    All,
    Cycle(i64),
    Discharge(i64),
    Charge(i64),
}

impl Default for CycleSelection {
    fn default() -> Self {
        CycleSelection::All
    }
}

impl FromStr for CycleSelection {
    type Err = FcpError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim().to_lowercase();
        if text.is_empty() || text == "all" {
            return Ok(CycleSelection::All);
        }
        let format_err = || FcpError::SpecFormat(s.trim().to_string());
        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            [word, number] if *word == "discharge" || *word == "charge" => {
                let k = parse_index(number).ok_or_else(format_err)?;
                Ok(if *word == "discharge" {
                    CycleSelection::Discharge(k)
                } else {
                    CycleSelection::Charge(k)
                })
            }
            [number] => parse_index(number)
                .map(CycleSelection::Cycle)
                .ok_or_else(format_err),
            _ => Err(format_err()),
        }
    }
}

/// Integers too large for `i64` saturate so they fail later as out of range.
fn parse_index(text: &str) -> Option<i64> {
    match text.parse::<i64>() {
        Ok(n) => Some(n),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

impl CycleSelection {
    /// Resolve to 1-based chronological cycle numbers.
    pub fn resolve(
        &self,
        cycles: &[Cycle],
        discharge: &[Cycle],
        charge: &[Cycle],
    ) -> Result<Vec<usize>> {
        match *self {
            CycleSelection::All => Ok((1..=cycles.len()).collect()),
            CycleSelection::Cycle(n) => {
                let n = checked_position(n, cycles.len(), "Cycle")?;
                Ok(vec![n])
            }
            CycleSelection::Discharge(k) => {
                let k = checked_position(k, discharge.len(), "Discharge cycle")?;
                chronological_number(&discharge[k - 1], cycles, "Discharge cycle").map(|n| vec![n])
            }
            CycleSelection::Charge(k) => {
                let k = checked_position(k, charge.len(), "Charge cycle")?;
                chronological_number(&charge[k - 1], cycles, "Charge cycle").map(|n| vec![n])
            }
        }
    }
}

fn checked_position(requested: i64, available: usize, kind: &'static str) -> Result<usize> {
    if requested >= 1 && (requested as u64) <= available as u64 {
        Ok(requested as usize)
    } else {
        Err(FcpError::CycleRange {
            kind,
            requested,
            available,
        })
    }
}

fn chronological_number(target: &Cycle, cycles: &[Cycle], kind: &'static str) -> Result<usize> {
    cycles
        .iter()
        .position(|cycle| cycle == target)
        .map(|idx| idx + 1)
        .ok_or(FcpError::CycleRange {
            kind,
            requested: target.start as i64,
            available: cycles.len(),
        })
}

/// Parse `spec` and resolve it against the chronological and per-kind lists.
pub fn select(
    spec: &str,
    cycles: &[Cycle],
    discharge: &[Cycle],
    charge: &[Cycle],
) -> Result<Vec<usize>> {
    spec.parse::<CycleSelection>()?
        .resolve(cycles, discharge, charge)
}
