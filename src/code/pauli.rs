//! Pauli letters, phases and their group multiplication

use crate::code::Qubit;
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Single-qubit Pauli letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    /// Multiply two letters, returning the product letter and the phase picked up
    pub fn multiply(self, other: Pauli) -> (Pauli, Sign) {
        use Pauli::*;
        match (self, other) {
            (I, p) | (p, I) => (p, Sign::PlusOne),
            (a, b) if a == b => (I, Sign::PlusOne),
            (X, Y) => (Z, Sign::PlusI),
            (Y, X) => (Z, Sign::MinusI),
            (Y, Z) => (X, Sign::PlusI),
            (Z, Y) => (X, Sign::MinusI),
            (Z, X) => (Y, Sign::PlusI),
            (X, Z) => (Y, Sign::MinusI),
            _ => unreachable!("all letter pairs covered"),
        }
    }

    /// Whether two letters commute when acting on the same qubit
    pub fn commutes_with(self, other: Pauli) -> bool {
        self == Pauli::I || other == Pauli::I || self == other
    }

    /// Upper-case letter used in program text
    pub fn as_char(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }

    /// Parse a letter, case-insensitive
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'I' => Some(Pauli::I),
            'X' => Some(Pauli::X),
            'Y' => Some(Pauli::Y),
            'Z' => Some(Pauli::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Pauli {
    type Err = QecError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.trim().chars();
        match (chars.next().and_then(Pauli::from_char), chars.next()) {
            (Some(p), None) => Ok(p),
            _ => Err(QecError::parse(format!("not a Pauli letter: {:?}", s), 0)),
        }
    }
}

/// Phase `i^k` attached to a Pauli operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sign {
    PlusOne,
    PlusI,
    MinusOne,
    MinusI,
}

impl Sign {
    /// Exponent `k` in `i^k`
    pub fn power(self) -> u8 {
        match self {
            Sign::PlusOne => 0,
            Sign::PlusI => 1,
            Sign::MinusOne => 2,
            Sign::MinusI => 3,
        }
    }

    /// Sign for `i^power`
    pub fn from_power(power: u8) -> Self {
        match power % 4 {
            0 => Sign::PlusOne,
            1 => Sign::PlusI,
            2 => Sign::MinusOne,
            _ => Sign::MinusI,
        }
    }

    /// Product of two phases
    pub fn times(self, other: Sign) -> Sign {
        Sign::from_power(self.power() + other.power())
    }

    /// Inverse phase
    pub fn inverse(self) -> Sign {
        Sign::from_power(4 - self.power())
    }

    /// True for ±1
    pub fn is_real(self) -> bool {
        self.power() % 2 == 0
    }
}

impl Default for Sign {
    fn default() -> Self {
        Sign::PlusOne
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sign::PlusOne => "+",
            Sign::PlusI => "+i",
            Sign::MinusOne => "-",
            Sign::MinusI => "-i",
        };
        write!(f, "{}", s)
    }
}

/// A Pauli letter together with its phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PauliOperator {
    pub pauli: Pauli,
    #[serde(default)]
    pub sign: Sign,
}

impl PauliOperator {
    /// Create an operator with an explicit sign
    pub fn new(pauli: Pauli, sign: Sign) -> Self {
        Self { pauli, sign }
    }

    /// Positive operator for a letter
    pub fn positive(pauli: Pauli) -> Self {
        Self::new(pauli, Sign::PlusOne)
    }

    /// Compose `self · other` following the Pauli group table
    pub fn compose(&self, other: &PauliOperator) -> PauliOperator {
        let (pauli, phase) = self.pauli.multiply(other.pauli);
        PauliOperator {
            pauli,
            sign: self.sign.times(other.sign).times(phase),
        }
    }
}

impl From<Pauli> for PauliOperator {
    fn from(pauli: Pauli) -> Self {
        Self::positive(pauli)
    }
}

impl fmt::Display for PauliOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sign {
            Sign::PlusOne => write!(f, "{}", self.pauli),
            sign => write!(f, "{}{}", sign, self.pauli),
        }
    }
}

/// Tensor product of Pauli letters over qubits, with an overall phase
///
/// Identity factors are never stored, so two products are equal exactly when
/// they act identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PauliProduct {
    factors: BTreeMap<Qubit, Pauli>,
    sign: Sign,
}

impl PauliProduct {
    /// The identity product
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build a product from per-qubit operators
    pub fn from_operators<'a>(operators: impl IntoIterator<Item = (&'a Qubit, &'a PauliOperator)>) -> Self {
        let mut product = Self::identity();
        for (qubit, operator) in operators {
            product.multiply_operator(qubit, operator);
        }
        product
    }

    /// Right-multiply by an operator on one qubit
    pub fn multiply_operator(&mut self, qubit: &Qubit, operator: &PauliOperator) {
        let current = self.factors.get(qubit).copied().unwrap_or(Pauli::I);
        let (letter, phase) = current.multiply(operator.pauli);
        self.sign = self.sign.times(operator.sign).times(phase);
        if letter == Pauli::I {
            self.factors.remove(qubit);
        } else {
            self.factors.insert(qubit.clone(), letter);
        }
    }

    /// Right-multiply by another product
    pub fn multiply(&mut self, other: &PauliProduct) {
        for (qubit, letter) in &other.factors {
            self.multiply_operator(qubit, &PauliOperator::positive(*letter));
        }
        self.sign = self.sign.times(other.sign);
    }

    /// Letter acting on `qubit` (identity if absent)
    pub fn letter(&self, qubit: &Qubit) -> Pauli {
        self.factors.get(qubit).copied().unwrap_or(Pauli::I)
    }

    /// Overall phase
    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// Qubits with a non-identity factor, in qubit order
    pub fn support(&self) -> impl Iterator<Item = &Qubit> {
        self.factors.keys()
    }

    /// Non-identity factors in qubit order
    pub fn factors(&self) -> impl Iterator<Item = (&Qubit, Pauli)> {
        self.factors.iter().map(|(q, p)| (q, *p))
    }

    /// Number of non-identity factors
    pub fn weight(&self) -> usize {
        self.factors.len()
    }

    pub fn is_identity(&self) -> bool {
        self.factors.is_empty()
    }

    /// Same letters on every qubit, phases allowed to differ by ±1
    pub fn matches_up_to_sign(&self, other: &PauliProduct) -> bool {
        self.factors == other.factors && self.sign.times(other.sign.inverse()).is_real()
    }

    /// Same letters on every qubit, ignoring phase
    pub fn same_letters(&self, other: &PauliProduct) -> bool {
        self.factors == other.factors
    }

    /// Two products commute iff they anticommute on an even number of qubits
    pub fn commutes_with(&self, other: &PauliProduct) -> bool {
        let clashes = self
            .factors
            .iter()
            .filter(|(qubit, letter)| !letter.commutes_with(other.letter(qubit)))
            .count();
        clashes % 2 == 0
    }

    /// Whether any qubit is shared with `other`
    pub fn intersects(&self, other: &PauliProduct) -> bool {
        self.factors.keys().any(|q| other.factors.contains_key(q))
    }
}

impl fmt::Display for PauliProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sign)?;
        for (i, (qubit, letter)) in self.factors.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write!(f, "{}{}", letter, qubit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplication_table() {
        assert_eq!(Pauli::X.multiply(Pauli::Y), (Pauli::Z, Sign::PlusI));
        assert_eq!(Pauli::Y.multiply(Pauli::X), (Pauli::Z, Sign::MinusI));
        assert_eq!(Pauli::Z.multiply(Pauli::X), (Pauli::Y, Sign::PlusI));
        assert_eq!(Pauli::X.multiply(Pauli::Z), (Pauli::Y, Sign::MinusI));
        assert_eq!(Pauli::Y.multiply(Pauli::Y), (Pauli::I, Sign::PlusOne));
        assert_eq!(Pauli::I.multiply(Pauli::Z), (Pauli::Z, Sign::PlusOne));
    }

    #[test]
    fn test_compose_accumulates_phase() {
        let x = PauliOperator::new(Pauli::X, Sign::MinusOne);
        let y = PauliOperator::new(Pauli::Y, Sign::PlusI);
        // (-X)(iY) = -i * XY = -i * iZ = Z
        assert_eq!(x.compose(&y), PauliOperator::positive(Pauli::Z));
    }

    #[test]
    fn test_product_cancels_to_identity() {
        let q = Qubit::at(&[0]);
        let mut product = PauliProduct::identity();
        product.multiply_operator(&q, &Pauli::Z.into());
        product.multiply_operator(&q, &Pauli::Z.into());
        assert!(product.is_identity());
        assert_eq!(product.sign(), Sign::PlusOne);
    }

    #[test]
    fn test_commutation() {
        let (a, b) = (Qubit::at(&[0]), Qubit::at(&[1]));
        let xx = PauliProduct::from_operators([(&a, &Pauli::X.into()), (&b, &Pauli::X.into())]);
        let zz = PauliProduct::from_operators([(&a, &Pauli::Z.into()), (&b, &Pauli::Z.into())]);
        let zi = PauliProduct::from_operators([(&a, &Pauli::Z.into())]);
        assert!(xx.commutes_with(&zz));
        assert!(!xx.commutes_with(&zi));
        assert!(zz.matches_up_to_sign(&zz.clone()));
    }

    #[test]
    fn test_parse_letter() {
        assert_eq!("y".parse::<Pauli>().unwrap(), Pauli::Y);
        assert!("XZ".parse::<Pauli>().is_err());
    }
}
