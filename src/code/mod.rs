//! Code description: data qubits, periodic check schedules and detectors
//!
//! Everything here is immutable once built. A [`Code`] is validated at
//! construction so the compiler can assume a well-formed schedule.

pub mod builder;
pub mod check;
pub mod detector;
pub mod logical;
pub mod pauli;

pub use builder::*;
pub use check::*;
pub use detector::*;
pub use logical::*;
pub use pauli::*;

use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Small integer coordinate vector, ordered lexicographically
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinates(pub SmallVec<[i32; 3]>);

impl Coordinates {
    pub fn new(values: &[i32]) -> Self {
        Self(SmallVec::from_slice(values))
    }

    /// Component-wise `self - origin`; `None` if the dimensions differ
    pub fn offset_from(&self, origin: &Coordinates) -> Option<Coordinates> {
        if self.0.len() != origin.0.len() {
            return None;
        }
        Some(Coordinates(
            self.0.iter().zip(origin.0.iter()).map(|(a, b)| a - b).collect(),
        ))
    }

    pub fn values(&self) -> &[i32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }
}

impl<const N: usize> From<[i32; N]> for Coordinates {
    fn from(values: [i32; N]) -> Self {
        Self::new(&values)
    }
}

impl From<&[i32]> for Coordinates {
    fn from(values: &[i32]) -> Self {
        Self::new(values)
    }
}

impl From<Vec<i32>> for Coordinates {
    fn from(values: Vec<i32>) -> Self {
        Self(SmallVec::from_vec(values))
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

/// Physical qubit, identified by its coordinates
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qubit(Coordinates);

impl Qubit {
    /// Create a qubit at the given coordinates
    pub fn new(coords: impl Into<Coordinates>) -> Self {
        Self(coords.into())
    }

    /// Shorthand for `Qubit::new(&[..])`
    pub fn at(values: &[i32]) -> Self {
        Self(Coordinates::new(values))
    }

    /// Get the qubit coordinates
    pub fn coords(&self) -> &Coordinates {
        &self.0
    }
}

impl From<Coordinates> for Qubit {
    fn from(coords: Coordinates) -> Self {
        Self(coords)
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single-qubit state a data qubit can be prepared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Zero,
    One,
    Plus,
    Minus,
    PlusI,
    MinusI,
}

impl State {
    /// The signed Pauli the state is a +1 eigenstate of
    pub fn stabilizer(self) -> PauliOperator {
        match self {
            State::Zero => PauliOperator::new(Pauli::Z, Sign::PlusOne),
            State::One => PauliOperator::new(Pauli::Z, Sign::MinusOne),
            State::Plus => PauliOperator::new(Pauli::X, Sign::PlusOne),
            State::Minus => PauliOperator::new(Pauli::X, Sign::MinusOne),
            State::PlusI => PauliOperator::new(Pauli::Y, Sign::PlusOne),
            State::MinusI => PauliOperator::new(Pauli::Y, Sign::MinusOne),
        }
    }

    /// Basis letter of the state
    pub fn basis(self) -> Pauli {
        self.stabilizer().pauli
    }
}

/// A stabilizer code with a periodic check schedule
///
/// Round `r` measures `check_schedule[r mod L]` and instantiates
/// `detector_schedule[r mod L]`, where `L` is the schedule length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CodeDescription", into = "CodeDescription")]
pub struct Code {
    data_qubits: BTreeMap<Coordinates, Qubit>,
    check_schedule: Vec<Vec<CheckRef>>,
    detector_schedule: Vec<Vec<Detector>>,
    logical_operators: Vec<LogicalOperator>,
}

impl Code {
    /// Build and validate a code
    pub fn new(
        data_qubits: impl IntoIterator<Item = Qubit>,
        check_schedule: Vec<Vec<CheckRef>>,
        detector_schedule: Vec<Vec<Detector>>,
        logical_operators: Vec<LogicalOperator>,
    ) -> Result<Self> {
        let mut qubits = BTreeMap::new();
        for qubit in data_qubits {
            if qubits.insert(qubit.coords().clone(), qubit.clone()).is_some() {
                return Err(QecError::invalid_code(format!(
                    "data qubit {} declared twice",
                    qubit
                )));
            }
        }

        let code = Self {
            data_qubits: qubits,
            check_schedule,
            detector_schedule,
            logical_operators,
        };
        code.validate()?;
        Ok(code)
    }

    fn validate(&self) -> Result<()> {
        let length = self.check_schedule.len();
        if length == 0 {
            return Err(QecError::invalid_code("check schedule is empty"));
        }
        if self.detector_schedule.len() != length {
            return Err(QecError::invalid_code(format!(
                "detector schedule has {} rounds but check schedule has {}",
                self.detector_schedule.len(),
                length
            )));
        }

        for (round, checks) in self.check_schedule.iter().enumerate() {
            let mut seen = HashSet::new();
            for check in checks {
                if let Some(qubit) = check.qubits().find(|q| !self.is_data_qubit(q)) {
                    return Err(QecError::invalid_code(format!(
                        "check {} in round {} touches {} which is not a data qubit",
                        check, round, qubit
                    )));
                }
                if let Some(ancilla) = check.ancilla() {
                    if self.is_data_qubit(ancilla) {
                        return Err(QecError::invalid_code(format!(
                            "ancilla {} of check {} is a data qubit",
                            ancilla, check
                        )));
                    }
                }
                if !seen.insert(check.as_ref()) {
                    return Err(QecError::invalid_code(format!(
                        "check {} appears twice in round {}",
                        check, round
                    )));
                }
            }
        }

        let schedule_length = length as i64;
        for (round, detectors) in self.detector_schedule.iter().enumerate() {
            for detector in detectors {
                if detector.end() != round {
                    return Err(QecError::invalid_code(format!(
                        "detector listed in round {} ends in round {}",
                        round,
                        detector.end()
                    )));
                }
                for timed in detector.timed_checks() {
                    if timed.offset < -schedule_length || timed.offset > 0 {
                        return Err(QecError::invalid_code(format!(
                            "detector offset {} outside [-{}, 0]",
                            timed.offset, length
                        )));
                    }
                    let scheduled = (round as i64 + timed.offset).rem_euclid(schedule_length) as usize;
                    if !self.check_schedule[scheduled]
                        .iter()
                        .any(|c| c.as_ref() == timed.check.as_ref())
                    {
                        return Err(QecError::invalid_code(format!(
                            "detector in round {} references {} at offset {} but it is not scheduled in round {}",
                            round, timed.check, timed.offset, scheduled
                        )));
                    }
                }
            }
        }

        for logical in &self.logical_operators {
            self.validate_logical(logical)?;
        }
        Ok(())
    }

    /// Check that a logical operator fits this code's qubits and period
    pub fn validate_logical(&self, logical: &LogicalOperator) -> Result<()> {
        if self.schedule_length() % logical.history_length() != 0 {
            return Err(QecError::invalid_code(format!(
                "logical operator history length {} does not divide schedule length {}",
                logical.history_length(),
                self.schedule_length()
            )));
        }
        for operator in logical.history() {
            if let Some(qubit) = operator.support().find(|q| !self.is_data_qubit(q)) {
                return Err(QecError::invalid_code(format!(
                    "logical operator acts on {} which is not a data qubit",
                    qubit
                )));
            }
        }
        Ok(())
    }

    /// Number of rounds in one period of the schedule
    pub fn schedule_length(&self) -> usize {
        self.check_schedule.len()
    }

    /// Data qubits in coordinate order
    pub fn data_qubits(&self) -> impl Iterator<Item = &Qubit> {
        self.data_qubits.values()
    }

    pub fn data_qubit_count(&self) -> usize {
        self.data_qubits.len()
    }

    pub fn is_data_qubit(&self, qubit: &Qubit) -> bool {
        self.data_qubits.contains_key(qubit.coords())
    }

    /// Checks measured in absolute round `round`
    pub fn checks_in_round(&self, round: usize) -> &[CheckRef] {
        &self.check_schedule[round % self.schedule_length()]
    }

    /// Detectors instantiated in absolute round `round`
    pub fn detectors_in_round(&self, round: usize) -> &[Detector] {
        &self.detector_schedule[round % self.schedule_length()]
    }

    pub fn check_schedule(&self) -> &[Vec<CheckRef>] {
        &self.check_schedule
    }

    pub fn detector_schedule(&self) -> &[Vec<Detector>] {
        &self.detector_schedule
    }

    pub fn logical_operators(&self) -> &[LogicalOperator] {
        &self.logical_operators
    }

    /// Distinct scheduled checks in first-appearance order
    pub fn distinct_checks(&self) -> Vec<CheckRef> {
        let mut seen = HashSet::new();
        self.check_schedule
            .iter()
            .flatten()
            .filter(|c| seen.insert(Arc::clone(c)))
            .cloned()
            .collect()
    }

    /// Ancilla qubits in first-appearance order
    pub fn ancillas(&self) -> Vec<Qubit> {
        let mut seen = HashSet::new();
        self.check_schedule
            .iter()
            .flatten()
            .filter_map(|c| c.ancilla())
            .filter(|a| seen.insert((*a).clone()))
            .cloned()
            .collect()
    }
}

/// Serialized form of a code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeDescription {
    pub data_qubits: Vec<Qubit>,
    pub check_schedule: Vec<Vec<CheckRef>>,
    pub detector_schedule: Vec<Vec<Detector>>,
    #[serde(default)]
    pub logical_operators: Vec<LogicalOperator>,
}

impl TryFrom<CodeDescription> for Code {
    type Error = QecError;

    fn try_from(description: CodeDescription) -> Result<Self> {
        Code::new(
            description.data_qubits,
            description.check_schedule,
            description.detector_schedule,
            description.logical_operators,
        )
    }
}

impl From<Code> for CodeDescription {
    fn from(code: Code) -> Self {
        Self {
            data_qubits: code.data_qubits.into_values().collect(),
            check_schedule: code.check_schedule,
            detector_schedule: code.detector_schedule,
            logical_operators: code.logical_operators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repetition() -> (Vec<Qubit>, CheckRef) {
        let data = vec![Qubit::at(&[0]), Qubit::at(&[2])];
        let check = Arc::new(
            Check::from_letters(
                &[(data[0].clone(), Pauli::Z), (data[1].clone(), Pauli::Z)],
                Some(Qubit::at(&[1])),
            )
            .unwrap(),
        );
        (data, check)
    }

    #[test]
    fn test_coordinate_ordering() {
        assert!(Coordinates::from([0, 5]) < Coordinates::from([1, 0]));
        assert_eq!(
            Coordinates::from([3, 4]).offset_from(&Coordinates::from([1, 1])),
            Some(Coordinates::from([2, 3]))
        );
        assert_eq!(Coordinates::from([1]).offset_from(&Coordinates::from([1, 1])), None);
    }

    #[test]
    fn test_state_stabilizers() {
        assert_eq!(State::One.stabilizer(), PauliOperator::new(Pauli::Z, Sign::MinusOne));
        assert_eq!(State::PlusI.basis(), Pauli::Y);
        assert_eq!(State::default(), State::Zero);
    }

    #[test]
    fn test_valid_code() {
        let (data, check) = repetition();
        let detector = Detector::new(
            vec![TimedCheck::new(-1, check.clone())],
            vec![TimedCheck::new(0, check.clone())],
            0,
        )
        .unwrap();
        let code = Code::new(data, vec![vec![check]], vec![vec![detector]], vec![]).unwrap();
        assert_eq!(code.schedule_length(), 1);
        assert_eq!(code.ancillas(), vec![Qubit::at(&[1])]);
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let (data, _) = repetition();
        let err = Code::new(data, vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, QecError::InvalidCode(_)));
    }

    #[test]
    fn test_mismatched_schedule_lengths_rejected() {
        let (data, check) = repetition();
        let err = Code::new(data, vec![vec![check]], vec![vec![], vec![]], vec![]).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_ancilla_on_data_qubit_rejected() {
        let data = vec![Qubit::at(&[0]), Qubit::at(&[1]), Qubit::at(&[2])];
        let check = Arc::new(
            Check::from_letters(
                &[(data[0].clone(), Pauli::Z), (data[2].clone(), Pauli::Z)],
                Some(data[1].clone()),
            )
            .unwrap(),
        );
        assert!(Code::new(data, vec![vec![check]], vec![vec![]], vec![]).is_err());
    }

    #[test]
    fn test_duplicate_check_rejected() {
        let (data, check) = repetition();
        let twin = Arc::new(Check::clone(&check));
        let err = Code::new(data, vec![vec![check, twin]], vec![vec![]], vec![]).unwrap_err();
        assert!(matches!(err, QecError::InvalidCode(_)));
    }

    #[test]
    fn test_unscheduled_floor_check_rejected() {
        let (data, check) = repetition();
        let other = Arc::new(
            Check::from_letters(&[(data[0].clone(), Pauli::Z)], None).unwrap(),
        );
        let detector = Detector::new(
            vec![TimedCheck::new(-1, check.clone())],
            vec![TimedCheck::new(0, check.clone())],
            0,
        )
        .unwrap();
        // Floor and lid agree, but `other` is never measured.
        let bogus = Detector::new(
            vec![TimedCheck::new(-1, other.clone())],
            vec![TimedCheck::new(0, other)],
            0,
        )
        .unwrap();
        let err = Code::new(
            data,
            vec![vec![check]],
            vec![vec![detector, bogus]],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, QecError::InvalidCode(_)));
    }
}
