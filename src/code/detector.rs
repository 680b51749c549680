//! Detectors: parity relations between a floor and a lid of timed checks

use crate::code::{CheckRef, PauliProduct, TimedCheck};
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};

/// Parity relation between check outcomes at different rounds
///
/// The floor is the product of earlier outcomes, the lid the later ones; the
/// detector fires when they disagree. Offsets are relative to `end`, the
/// round in which the lid's freshest check is measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DetectorDescription", into = "DetectorDescription")]
pub struct Detector {
    floor: Vec<TimedCheck>,
    lid: Vec<TimedCheck>,
    end: usize,
}

impl Detector {
    pub fn new(floor: Vec<TimedCheck>, lid: Vec<TimedCheck>, end: usize) -> Result<Self> {
        if let Some(timed) = floor.iter().chain(lid.iter()).find(|t| t.offset > 0) {
            return Err(QecError::invalid_detector(format!(
                "positive offset {} on {}",
                timed.offset, timed.check
            )));
        }
        if !lid.iter().any(|t| t.offset == 0) {
            return Err(QecError::invalid_detector(
                "lid has no check measured in the end round",
            ));
        }

        let floor_product = Self::product_of(&floor);
        let lid_product = Self::product_of(&lid);
        if !floor_product.matches_up_to_sign(&lid_product) {
            return Err(QecError::invalid_detector(format!(
                "floor {} does not match lid {}",
                floor_product, lid_product
            )));
        }

        Ok(Self { floor, lid, end })
    }

    /// Detector comparing one check against its previous measurement `period` rounds earlier
    pub fn repeated(check: CheckRef, period: usize, end: usize) -> Result<Self> {
        Self::new(
            vec![TimedCheck::new(-(period as i64), check.clone())],
            vec![TimedCheck::new(0, check)],
            end,
        )
    }

    fn product_of(timed: &[TimedCheck]) -> PauliProduct {
        let mut product = PauliProduct::identity();
        for t in timed {
            product.multiply(t.check.product());
        }
        product
    }

    pub fn floor(&self) -> &[TimedCheck] {
        &self.floor
    }

    pub fn lid(&self) -> &[TimedCheck] {
        &self.lid
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Floor then lid
    pub fn timed_checks(&self) -> impl Iterator<Item = &TimedCheck> {
        self.floor.iter().chain(self.lid.iter())
    }

    /// Constituent `(check, absolute round)` pairs when the lid closes in `round`
    pub fn triggers(&self, round: i64) -> Vec<(CheckRef, i64)> {
        self.timed_checks()
            .map(|t| (t.check.clone(), round + t.offset))
            .collect()
    }
}

/// Serialized form of a detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorDescription {
    #[serde(default)]
    pub floor: Vec<TimedCheck>,
    pub lid: Vec<TimedCheck>,
    pub end: usize,
}

impl TryFrom<DetectorDescription> for Detector {
    type Error = QecError;

    fn try_from(description: DetectorDescription) -> Result<Self> {
        Detector::new(description.floor, description.lid, description.end)
    }
}

impl From<Detector> for DetectorDescription {
    fn from(detector: Detector) -> Self {
        Self {
            floor: detector.floor,
            lid: detector.lid,
            end: detector.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Check, Pauli, Qubit};
    use std::sync::Arc;

    fn check(letters: &[(i32, Pauli)]) -> CheckRef {
        let letters: Vec<_> = letters.iter().map(|(i, p)| (Qubit::at(&[*i]), *p)).collect();
        Arc::new(Check::from_letters(&letters, None).unwrap())
    }

    #[test]
    fn test_repeated_detector() {
        let zz = check(&[(0, Pauli::Z), (1, Pauli::Z)]);
        let detector = Detector::repeated(zz.clone(), 1, 0).unwrap();
        let triggers = detector.triggers(5);
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].1, 4);
        assert_eq!(triggers[1].1, 5);
    }

    #[test]
    fn test_floor_lid_mismatch() {
        let zz = check(&[(0, Pauli::Z), (1, Pauli::Z)]);
        let xx = check(&[(0, Pauli::X), (1, Pauli::X)]);
        let err = Detector::new(
            vec![TimedCheck::new(-1, xx)],
            vec![TimedCheck::new(0, zz)],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, QecError::InvalidDetector(_)));
    }

    #[test]
    fn test_products_compose_across_checks() {
        // Z0Z1 * Z1Z2 in the floor equals Z0Z2 in the lid
        let z01 = check(&[(0, Pauli::Z), (1, Pauli::Z)]);
        let z12 = check(&[(1, Pauli::Z), (2, Pauli::Z)]);
        let z02 = check(&[(0, Pauli::Z), (2, Pauli::Z)]);
        let detector = Detector::new(
            vec![TimedCheck::new(-1, z01), TimedCheck::new(-1, z12)],
            vec![TimedCheck::new(0, z02)],
            1,
        );
        assert!(detector.is_ok());
    }

    #[test]
    fn test_lid_needs_fresh_check() {
        let zz = check(&[(0, Pauli::Z), (1, Pauli::Z)]);
        let result = Detector::new(
            vec![TimedCheck::new(-2, zz.clone())],
            vec![TimedCheck::new(-1, zz)],
            0,
        );
        assert!(result.is_err());
    }
}
