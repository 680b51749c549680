//! Checks: multi-qubit Pauli measurements mediated by an ancilla

use crate::code::{Coordinates, Pauli, PauliOperator, PauliProduct, Qubit, Sign};
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One qubit of a check: its position relative to the anchor, the qubit and its operator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckMember {
    pub offset: Coordinates,
    pub qubit: Qubit,
    pub operator: PauliOperator,
}

/// A multi-qubit Pauli measurement
///
/// Checks are values: two checks with the same `(qubit, operator)` content are
/// equal and hash identically, whatever order their members were declared in
/// and whichever ancilla measures them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CheckDescription", into = "CheckDescription")]
pub struct Check {
    members: Vec<CheckMember>,
    anchor: Option<Coordinates>,
    ancilla: Option<Qubit>,
    product: PauliProduct,
    canonical: Vec<(Qubit, PauliOperator)>,
}

/// Shared handle to a check; measurement keys and schedules hold these
pub type CheckRef = Arc<Check>;

impl Check {
    /// Build a check from explicit members
    pub fn new(
        members: Vec<CheckMember>,
        anchor: Option<Coordinates>,
        ancilla: Option<Qubit>,
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(QecError::invalid_check("a check needs at least one qubit"));
        }

        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(&member.qubit) {
                return Err(QecError::invalid_check(format!(
                    "qubit {} appears twice",
                    member.qubit
                )));
            }
            if member.operator.pauli == Pauli::I {
                return Err(QecError::invalid_check(format!(
                    "identity operator on qubit {}",
                    member.qubit
                )));
            }
        }

        if let Some(ancilla) = &ancilla {
            if seen.contains(ancilla) {
                return Err(QecError::invalid_check(format!(
                    "ancilla {} is also a member qubit",
                    ancilla
                )));
            }
        }

        let product =
            PauliProduct::from_operators(members.iter().map(|m| (&m.qubit, &m.operator)));
        if !product.sign().is_real() {
            return Err(QecError::invalid_check(format!(
                "product {} is not Hermitian",
                product
            )));
        }

        let mut canonical: Vec<_> = members
            .iter()
            .map(|m| (m.qubit.clone(), m.operator))
            .collect();
        canonical.sort();

        Ok(Self {
            members,
            anchor,
            ancilla,
            product,
            canonical,
        })
    }

    /// Build a check around an anchor; member offsets are taken relative to it
    pub fn around(
        anchor: impl Into<Coordinates>,
        operators: Vec<(Qubit, PauliOperator)>,
        ancilla: Option<Qubit>,
    ) -> Result<Self> {
        let anchor = anchor.into();
        let members = operators
            .into_iter()
            .map(|(qubit, operator)| {
                let offset = qubit.coords().offset_from(&anchor).ok_or_else(|| {
                    QecError::invalid_check(format!(
                        "qubit {} and anchor {} have different dimensions",
                        qubit, anchor
                    ))
                })?;
                Ok(CheckMember {
                    offset,
                    qubit,
                    operator,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(members, Some(anchor), ancilla)
    }

    /// Build a check from `(qubit, letter)` pairs anchored at the ancilla
    ///
    /// Without an ancilla the first qubit is used as anchor.
    pub fn from_letters(letters: &[(Qubit, Pauli)], ancilla: Option<Qubit>) -> Result<Self> {
        let anchor = ancilla
            .as_ref()
            .or_else(|| letters.first().map(|(q, _)| q))
            .map(|q| q.coords().clone())
            .ok_or_else(|| QecError::invalid_check("a check needs at least one qubit"))?;
        let operators = letters
            .iter()
            .map(|(q, p)| (q.clone(), PauliOperator::positive(*p)))
            .collect();
        Self::around(anchor, operators, ancilla)
    }

    /// Members in declared order
    pub fn members(&self) -> &[CheckMember] {
        &self.members
    }

    pub fn anchor(&self) -> Option<&Coordinates> {
        self.anchor.as_ref()
    }

    pub fn ancilla(&self) -> Option<&Qubit> {
        self.ancilla.as_ref()
    }

    /// Composed Pauli product of all members
    pub fn product(&self) -> &PauliProduct {
        &self.product
    }

    /// Overall sign of the product (always ±1)
    pub fn sign(&self) -> Sign {
        self.product.sign()
    }

    pub fn weight(&self) -> usize {
        self.members.len()
    }

    /// Qubits in declared order
    pub fn qubits(&self) -> impl Iterator<Item = &Qubit> {
        self.members.iter().map(|m| &m.qubit)
    }

    /// The single letter of the check if every member carries it
    pub fn pure_letter(&self) -> Option<Pauli> {
        let first = self.members[0].operator.pauli;
        self.members
            .iter()
            .all(|m| m.operator.pauli == first)
            .then_some(first)
    }

    /// Product letters concatenated in declared order, e.g. `XZZX`
    pub fn word(&self) -> String {
        self.members.iter().map(|m| m.operator.pauli.as_char()).collect()
    }

    /// Whether both checks can be measured without disturbing each other
    pub fn commutes_with(&self, other: &Check) -> bool {
        self.product.commutes_with(&other.product)
    }

    /// Whether the check touches `qubit`
    pub fn acts_on(&self, qubit: &Qubit) -> bool {
        self.members.iter().any(|m| &m.qubit == qubit)
    }
}

impl PartialEq for Check {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Check {}

impl Hash for Check {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product)
    }
}

/// Serialized form of a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDescription {
    pub members: Vec<CheckMember>,
    #[serde(default)]
    pub anchor: Option<Coordinates>,
    #[serde(default)]
    pub ancilla: Option<Qubit>,
}

impl TryFrom<CheckDescription> for Check {
    type Error = QecError;

    fn try_from(description: CheckDescription) -> Result<Self> {
        Check::new(description.members, description.anchor, description.ancilla)
    }
}

impl From<Check> for CheckDescription {
    fn from(check: Check) -> Self {
        Self {
            members: check.members,
            anchor: check.anchor,
            ancilla: check.ancilla,
        }
    }
}

/// A check as measured `offset` rounds relative to some reference round
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimedCheck {
    pub offset: i64,
    pub check: CheckRef,
}

impl TimedCheck {
    pub fn new(offset: i64, check: CheckRef) -> Self {
        Self { offset, check }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn zz(a: i32, b: i32) -> Check {
        Check::from_letters(
            &[(Qubit::at(&[a]), Pauli::Z), (Qubit::at(&[b]), Pauli::Z)],
            Some(Qubit::at(&[a + 1])),
        )
        .unwrap()
    }

    #[test]
    fn test_content_equality_and_dedup() {
        let first = zz(0, 2);
        let second = Check::from_letters(
            &[(Qubit::at(&[2]), Pauli::Z), (Qubit::at(&[0]), Pauli::Z)],
            None,
        )
        .unwrap();
        assert_eq!(first, second);

        let set: HashSet<Check> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_non_hermitian_rejected() {
        let members = vec![CheckMember {
            offset: Coordinates::from([0]),
            qubit: Qubit::at(&[0]),
            operator: PauliOperator::new(Pauli::X, Sign::PlusI),
        }];
        let err = Check::new(members, None, None).unwrap_err();
        assert!(matches!(err, QecError::InvalidCheck(_)));
    }

    #[test]
    fn test_imaginary_pair_is_hermitian() {
        let members = [0, 1]
            .into_iter()
            .map(|i| CheckMember {
                offset: Coordinates::from([i]),
                qubit: Qubit::at(&[i]),
                operator: PauliOperator::new(Pauli::Y, Sign::PlusI),
            })
            .collect();
        let check = Check::new(members, None, None).unwrap();
        assert_eq!(check.sign(), Sign::MinusOne);
    }

    #[test]
    fn test_repeated_qubit_rejected() {
        let q = Qubit::at(&[0]);
        let result = Check::from_letters(&[(q.clone(), Pauli::X), (q, Pauli::Z)], None);
        assert!(result.is_err());
    }

    #[test]
    fn test_offsets_relative_to_anchor() {
        let check = Check::from_letters(
            &[(Qubit::at(&[0, 0]), Pauli::X), (Qubit::at(&[2, 0]), Pauli::X)],
            Some(Qubit::at(&[1, 1])),
        )
        .unwrap();
        assert_eq!(check.members()[0].offset, Coordinates::from([-1, -1]));
        assert_eq!(check.members()[1].offset, Coordinates::from([1, -1]));
        assert_eq!(check.pure_letter(), Some(Pauli::X));
        assert_eq!(check.word(), "XX");
    }

    #[test]
    fn test_json_round_trip_validates() {
        let check = zz(0, 2);
        let json = serde_json::to_string(&check).unwrap();
        let back: Check = serde_json::from_str(&json).unwrap();
        assert_eq!(back, check);
        assert_eq!(back.ancilla(), check.ancilla());
    }
}
