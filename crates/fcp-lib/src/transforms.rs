use crate::error::{FcpError, Result};
use crate::table::Field;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

pub fn seconds_to_hours(values: &[f64]) -> Vec<f64> {
    values.iter().map(|s| s / SECONDS_PER_HOUR).collect()
}

/// Capacity per gram of active material.
pub fn normalize_by_mass(values: &[f64], mass_g: f64) -> Result<Vec<f64>> {
    if !mass_g.is_finite() || mass_g <= 0.0 {
        return Err(FcpError::InvalidMass(mass_g));
    }
    Ok(values.iter().map(|q| q / mass_g).collect())
}

/// Convert extracted values into plotting units for `field`.
pub fn axis_values(field: Field, values: &[f64], active_mass: Option<f64>) -> Result<Vec<f64>> {
    match (field, active_mass) {
        (Field::Time, _) => Ok(seconds_to_hours(values)),
        (Field::Capacity, Some(mass)) => normalize_by_mass(values, mass),
        _ => Ok(values.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_converted_to_hours() {
        assert_eq!(seconds_to_hours(&[0.0, 1800.0, 7200.0]), vec![0.0, 0.5, 2.0]);
    }

    #[test]
    fn capacity_is_divided_by_mass_only_when_given() {
        let q = [1.0, 2.0];
        assert_eq!(axis_values(Field::Capacity, &q, Some(0.5)).unwrap(), vec![2.0, 4.0]);
        assert_eq!(axis_values(Field::Capacity, &q, None).unwrap(), q.to_vec());
        assert_eq!(axis_values(Field::Potential, &q, Some(0.5)).unwrap(), q.to_vec());
    }

    #[test]
    fn rejects_non_positive_mass() {
        for mass in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(normalize_by_mass(&[1.0], mass).is_err());
        }
    }
}
