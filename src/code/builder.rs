//! Code builder for programmatic code construction

use crate::code::{Check, CheckRef, Code, Detector, LogicalOperator, Pauli, Qubit, TimedCheck};
use crate::{QecError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing codes round by round
///
/// Checks are interned by content, so detectors built with
/// [`CodeBuilder::check`] share the same handle as the schedule.
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    data_qubits: Vec<Qubit>,
    rounds: Vec<Vec<CheckRef>>,
    detectors: Vec<Vec<Detector>>,
    logical_operators: Vec<LogicalOperator>,
    interned: HashMap<Check, CheckRef>,
}

impl CodeBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the final code
    pub fn build(self) -> Result<Code> {
        Code::new(
            self.data_qubits,
            self.rounds,
            self.detectors,
            self.logical_operators,
        )
    }

    /// Add a data qubit
    pub fn data_qubit(mut self, qubit: impl Into<Qubit>) -> Self {
        self.data_qubits.push(qubit.into());
        self
    }

    /// Add several data qubits
    pub fn data_qubits(mut self, qubits: impl IntoIterator<Item = Qubit>) -> Self {
        self.data_qubits.extend(qubits);
        self
    }

    /// Intern a check, returning the shared handle
    ///
    /// A check whose content matches an interned one but names a different
    /// ancilla is rejected.
    pub fn check(&mut self, check: Check) -> Result<CheckRef> {
        if let Some(existing) = self.interned.get(&check) {
            if existing.ancilla() != check.ancilla() {
                return Err(QecError::invalid_check(format!(
                    "check {} already interned with ancilla {:?}, got {:?}",
                    check,
                    existing.ancilla(),
                    check.ancilla()
                )));
            }
            return Ok(existing.clone());
        }
        let handle = Arc::new(check.clone());
        self.interned.insert(check, handle.clone());
        Ok(handle)
    }

    /// Intern a check given as `(qubit, letter)` pairs
    pub fn check_from_letters(
        &mut self,
        letters: &[(Qubit, Pauli)],
        ancilla: Option<Qubit>,
    ) -> Result<CheckRef> {
        self.check(Check::from_letters(letters, ancilla)?)
    }

    /// Append a round of checks with no detectors yet
    pub fn round(mut self, checks: Vec<CheckRef>) -> Self {
        self.rounds.push(checks);
        self.detectors.push(Vec::new());
        self
    }

    /// Add a detector ending in `round`
    pub fn detector(mut self, round: usize, floor: Vec<TimedCheck>, lid: Vec<TimedCheck>) -> Result<Self> {
        let slot = self.detectors.get_mut(round).ok_or_else(|| {
            QecError::invalid_code(format!("no round {} to attach a detector to", round))
        })?;
        slot.push(Detector::new(floor, lid, round)?);
        Ok(self)
    }

    /// Compare every check in every round with its previous occurrence
    ///
    /// For each check the floor is its most recent earlier measurement within
    /// one period, which is what static codes and most Floquet codes need.
    pub fn with_repeated_detectors(mut self) -> Result<Self> {
        let length = self.rounds.len();
        for round in 0..length {
            for check in self.rounds[round].clone() {
                let period = (1..=length)
                    .find(|back| {
                        let earlier = (round + length - back) % length;
                        self.rounds[earlier].contains(&check)
                    })
                    .unwrap_or(length);
                self.detectors[round].push(Detector::repeated(check, period, round)?);
            }
        }
        Ok(self)
    }

    /// Add a logical operator
    pub fn logical(mut self, logical: LogicalOperator) -> Self {
        self.logical_operators.push(logical);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repetition_code_builder() {
        let mut builder = CodeBuilder::new().data_qubits([Qubit::at(&[0]), Qubit::at(&[2])]);
        let zz = builder
            .check_from_letters(
                &[(Qubit::at(&[0]), Pauli::Z), (Qubit::at(&[2]), Pauli::Z)],
                Some(Qubit::at(&[1])),
            )
            .unwrap();
        let code = builder
            .round(vec![zz])
            .with_repeated_detectors()
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(code.schedule_length(), 1);
        assert_eq!(code.detectors_in_round(7).len(), 1);
        assert_eq!(code.detectors_in_round(0)[0].floor()[0].offset, -1);
    }

    #[test]
    fn test_interning_shares_handles() {
        let mut builder = CodeBuilder::new();
        let a = builder
            .check_from_letters(&[(Qubit::at(&[0]), Pauli::X)], None)
            .unwrap();
        let b = builder
            .check_from_letters(&[(Qubit::at(&[0]), Pauli::X)], None)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_interning_rejects_different_ancilla() {
        let letters = [(Qubit::at(&[0]), Pauli::Z), (Qubit::at(&[2]), Pauli::Z)];
        let mut builder = CodeBuilder::new();
        let first = builder
            .check_from_letters(&letters, Some(Qubit::at(&[1])))
            .unwrap();
        let again = builder
            .check_from_letters(&letters, Some(Qubit::at(&[1])))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let err = builder
            .check_from_letters(&letters, Some(Qubit::at(&[3])))
            .unwrap_err();
        assert!(matches!(err, QecError::InvalidCheck(_)));
        let err = builder.check_from_letters(&letters, None).unwrap_err();
        assert!(matches!(err, QecError::InvalidCheck(_)));
    }

    #[test]
    fn test_detector_on_missing_round() {
        let mut builder = CodeBuilder::new();
        let z = builder
            .check_from_letters(&[(Qubit::at(&[0]), Pauli::Z)], None)
            .unwrap();
        let result = builder.detector(3, vec![], vec![TimedCheck::new(0, z)]);
        assert!(result.is_err());
    }
}
