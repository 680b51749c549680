//! Logical operators whose representative may change from round to round

use crate::code::{PauliOperator, PauliProduct, Qubit};
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};

/// A logical Pauli operator with a periodic history
///
/// The representative valid before absolute round `r` is `history[r mod h]`.
/// Codes whose logicals never move use a history of length one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<(Qubit, PauliOperator)>>", into = "Vec<Vec<(Qubit, PauliOperator)>>")]
pub struct LogicalOperator {
    history: Vec<PauliProduct>,
    operators: Vec<Vec<(Qubit, PauliOperator)>>,
}

impl LogicalOperator {
    /// Build from a history of per-qubit operator lists
    pub fn new(history: Vec<Vec<(Qubit, PauliOperator)>>) -> Result<Self> {
        if history.is_empty() {
            return Err(QecError::invalid_code("logical operator has an empty history"));
        }
        let products = history
            .iter()
            .map(|operators| {
                let product =
                    PauliProduct::from_operators(operators.iter().map(|(q, op)| (q, op)));
                if product.is_identity() {
                    return Err(QecError::invalid_code("logical operator is the identity"));
                }
                if !product.sign().is_real() {
                    return Err(QecError::invalid_code(format!(
                        "logical operator {} is not Hermitian",
                        product
                    )));
                }
                Ok(product)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            history: products,
            operators: history,
        })
    }

    /// A logical whose representative never changes
    pub fn fixed(operators: Vec<(Qubit, PauliOperator)>) -> Result<Self> {
        Self::new(vec![operators])
    }

    /// Representative valid before absolute round `round`
    pub fn at(&self, round: usize) -> &PauliProduct {
        &self.history[round % self.history.len()]
    }

    pub fn history(&self) -> &[PauliProduct] {
        &self.history
    }

    pub fn history_length(&self) -> usize {
        self.history.len()
    }
}

impl TryFrom<Vec<Vec<(Qubit, PauliOperator)>>> for LogicalOperator {
    type Error = QecError;

    fn try_from(history: Vec<Vec<(Qubit, PauliOperator)>>) -> Result<Self> {
        Self::new(history)
    }
}

impl From<LogicalOperator> for Vec<Vec<(Qubit, PauliOperator)>> {
    fn from(logical: LogicalOperator) -> Self {
        logical.operators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Pauli;

    #[test]
    fn test_history_indexing() {
        let q = Qubit::at(&[0]);
        let logical = LogicalOperator::new(vec![
            vec![(q.clone(), Pauli::X.into())],
            vec![(q.clone(), Pauli::Z.into())],
        ])
        .unwrap();
        assert_eq!(logical.at(0).letter(&q), Pauli::X);
        assert_eq!(logical.at(3).letter(&q), Pauli::Z);
        assert_eq!(logical.history_length(), 2);
    }

    #[test]
    fn test_identity_rejected() {
        assert!(LogicalOperator::fixed(vec![]).is_err());
    }
}
