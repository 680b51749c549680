//! Logical observable tracking

use crate::circuit::{Circuit, MeasurementRef};
use crate::code::{Code, LogicalOperator, Pauli, PauliProduct, Qubit};
use crate::{QecError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Follows one logical operator through the schedule
///
/// Whenever the declared representative changes between rounds, the checks
/// just measured are multiplied in and their outcomes toggled into the
/// observable, so the include set is a mod-2 accumulation.
#[derive(Debug, Clone)]
pub struct ObservableTracker {
    index: usize,
    logical: LogicalOperator,
    current: PauliProduct,
    pending: BTreeSet<MeasurementRef>,
}

impl ObservableTracker {
    pub fn new(index: usize, logical: LogicalOperator) -> Self {
        let current = logical.at(0).clone();
        Self {
            index,
            logical,
            current,
            pending: BTreeSet::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Representative currently tracked
    pub fn current(&self) -> &PauliProduct {
        &self.current
    }

    fn toggle(&mut self, reference: MeasurementRef) {
        if !self.pending.remove(&reference) {
            self.pending.insert(reference);
        }
    }

    /// Move from the representative before `round` to the one before `round + 1`
    pub fn advance(&mut self, code: &Code, round: usize, circuit: &Circuit) -> Result<()> {
        let next = self.logical.at(round + 1).clone();
        if self.current.same_letters(&next) {
            self.current = next;
            return Ok(());
        }

        let support = self.current.clone();
        for check in code.checks_in_round(round) {
            if !check.product().intersects(&support) {
                continue;
            }
            self.current.multiply(check.product());
            let reference = circuit.reference(check, round as i64).map_err(|_| {
                QecError::NotYetMeasured(format!("{} @ round {}", check, round))
            })?;
            self.toggle(reference);
        }

        if !self.current.same_letters(&next) {
            return Err(QecError::observable(format!(
                "observable {} after round {} is {}, expected {}",
                self.index, round, self.current, next
            )));
        }
        self.current = next;
        Ok(())
    }

    /// Include the final data measurements covering the current representative
    pub fn close(
        &mut self,
        total_rounds: usize,
        finals: &BTreeMap<Qubit, (Pauli, MeasurementRef)>,
    ) -> Result<()> {
        let expected = self.logical.at(total_rounds);
        if !self.current.same_letters(expected) {
            return Err(QecError::observable(format!(
                "observable {} ends as {}, expected {}",
                self.index, self.current, expected
            )));
        }
        let factors: Vec<(Qubit, Pauli)> = self
            .current
            .factors()
            .map(|(q, p)| (q.clone(), p))
            .collect();
        for (qubit, letter) in factors {
            match finals.get(&qubit) {
                Some((basis, reference)) if *basis == letter => self.toggle(*reference),
                _ => {
                    return Err(QecError::observable(format!(
                        "observable {} needs {} measured in the {} basis at the end",
                        self.index, qubit, letter
                    )))
                }
            }
        }
        Ok(())
    }

    /// Drain the accumulated toggles in record order
    pub fn take_pending(&mut self) -> Vec<MeasurementRef> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Gate, MeasurementKey};
    use crate::code::{CodeBuilder, PauliOperator};

    #[test]
    fn test_moving_logical_toggles_checks() {
        // Two-qubit toy: X0 becomes X1 after multiplying by the X0X1 check.
        let (q0, q1) = (Qubit::at(&[0]), Qubit::at(&[1]));
        let mut builder = CodeBuilder::new().data_qubits([q0.clone(), q1.clone()]);
        let xx = builder
            .check_from_letters(&[(q0.clone(), Pauli::X), (q1.clone(), Pauli::X)], None)
            .unwrap();
        let logical = LogicalOperator::new(vec![
            vec![(q0.clone(), PauliOperator::positive(Pauli::X))],
            vec![(q1.clone(), PauliOperator::positive(Pauli::X))],
        ])
        .unwrap();
        let code = builder
            .round(vec![xx.clone()])
            .round(vec![xx.clone()])
            .logical(logical.clone())
            .build()
            .unwrap();

        let mut circuit = Circuit::new();
        let r0 = circuit
            .add_product_measurement(
                0,
                &[(q0.clone(), Pauli::X), (q1.clone(), Pauli::X)],
                None,
                MeasurementKey::new(xx.clone(), 0),
            )
            .unwrap();
        let r1 = circuit
            .add_product_measurement(
                1,
                &[(q0.clone(), Pauli::X), (q1.clone(), Pauli::X)],
                None,
                MeasurementKey::new(xx, 1),
            )
            .unwrap();

        let mut tracker = ObservableTracker::new(0, logical);
        tracker.advance(&code, 0, &circuit).unwrap();
        assert_eq!(tracker.current().letter(&q1), Pauli::X);
        tracker.advance(&code, 1, &circuit).unwrap();
        assert_eq!(tracker.current().letter(&q0), Pauli::X);
        assert_eq!(tracker.take_pending(), vec![r0, r1]);
        assert!(tracker.take_pending().is_empty());
    }

    #[test]
    fn test_close_requires_matching_basis() {
        let q = Qubit::at(&[0]);
        let logical = LogicalOperator::fixed(vec![(q.clone(), Pauli::Z.into())]).unwrap();
        let mut tracker = ObservableTracker::new(0, logical);

        let mut circuit = Circuit::new();
        let check = std::sync::Arc::new(
            crate::code::Check::from_letters(&[(q.clone(), Pauli::X)], None).unwrap(),
        );
        let reference = circuit
            .add_measurement(0, Gate::MX, &q, None, MeasurementKey::new(check, 0))
            .unwrap();
        let finals: BTreeMap<_, _> = [(q, (Pauli::X, reference))].into_iter().collect();
        assert!(matches!(tracker.close(1, &finals), Err(QecError::Observable(_))));
    }
}
