//! Syndrome extraction: how one check is measured through its ancilla
//!
//! A [`SyndromeExtractor`] turns a check into an [`ExtractionPlan`]: the
//! ancilla preparation, an ordered list of ancilla-data interactions (with
//! `None` placeholders for idle slots) and the ancilla measurement basis.

pub mod rotated;
pub mod trivial;

pub use rotated::*;
pub use trivial::*;

use crate::circuit::Gate;
use crate::code::{Check, CheckMember, Pauli, Qubit, State};
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};

/// Decides the order in which a check's data qubits interact with the ancilla
pub trait InteractionOrderer {
    /// Members in interaction order; `None` marks an idle slot
    fn order<'a>(&self, check: &'a Check) -> Result<Vec<Option<&'a CheckMember>>>;
}

/// Available orderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Orderer {
    Trivial(TrivialOrderer),
    RotatedLattice(RotatedLatticeOrderer),
}

impl Default for Orderer {
    fn default() -> Self {
        Orderer::Trivial(TrivialOrderer::default())
    }
}

impl InteractionOrderer for Orderer {
    fn order<'a>(&self, check: &'a Check) -> Result<Vec<Option<&'a CheckMember>>> {
        match self {
            Orderer::Trivial(orderer) => orderer.order(check),
            Orderer::RotatedLattice(orderer) => orderer.order(check),
        }
    }
}

/// Gate pattern used between ancilla and data qubits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStyle {
    /// Ancilla in |+>, controlled-P from the ancilla onto each data qubit, X measurement
    #[default]
    ControlledPauli,
    /// CNOTs only: pure-X checks from an |+> ancilla, pure-Z checks into an |0> ancilla
    PureCnot,
    /// Data qubits rotated into the Z basis around a CNOT into an |0> ancilla
    RotatedCnot,
}

/// One ancilla-data interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub data: Qubit,
    pub gate: Gate,
    /// Whether the ancilla is the control (first) operand
    pub ancilla_is_control: bool,
    /// Single-qubit gate on the data qubit in the tick before
    pub pre_rotation: Option<Gate>,
    /// Single-qubit gate on the data qubit in the tick after
    pub post_rotation: Option<Gate>,
}

impl Interaction {
    fn plain(data: &Qubit, gate: Gate, ancilla_is_control: bool) -> Self {
        Self {
            data: data.clone(),
            gate,
            ancilla_is_control,
            pre_rotation: None,
            post_rotation: None,
        }
    }
}

/// Everything needed to measure one check through its ancilla
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub ancilla_state: State,
    pub measurement_basis: Pauli,
    pub steps: Vec<Option<Interaction>>,
}

/// Extraction strategy: a gate style plus an interaction orderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyndromeExtractor {
    pub style: ExtractionStyle,
    pub orderer: Orderer,
}

impl SyndromeExtractor {
    pub fn new(style: ExtractionStyle, orderer: Orderer) -> Self {
        Self { style, orderer }
    }

    /// Plan the measurement of `check`
    pub fn extract(&self, check: &Check) -> Result<ExtractionPlan> {
        let ordered = self.orderer.order(check)?;
        match self.style {
            ExtractionStyle::ControlledPauli => {
                let steps = ordered
                    .into_iter()
                    .map(|slot| {
                        slot.map(|m| {
                            Gate::controlled(m.operator.pauli)
                                .map(|gate| Interaction::plain(&m.qubit, gate, true))
                        })
                        .transpose()
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ExtractionPlan {
                    ancilla_state: State::Plus,
                    measurement_basis: Pauli::X,
                    steps,
                })
            }
            ExtractionStyle::PureCnot => {
                let (ancilla_state, measurement_basis, ancilla_is_control) = match check.pure_letter() {
                    Some(Pauli::X) => (State::Plus, Pauli::X, true),
                    Some(Pauli::Z) => (State::Zero, Pauli::Z, false),
                    _ => {
                        return Err(QecError::extraction(format!(
                            "CNOT-only extraction needs a pure X or Z check, got {}",
                            check.word()
                        )))
                    }
                };
                let steps = ordered
                    .into_iter()
                    .map(|slot| slot.map(|m| Interaction::plain(&m.qubit, Gate::CX, ancilla_is_control)))
                    .collect();
                Ok(ExtractionPlan {
                    ancilla_state,
                    measurement_basis,
                    steps,
                })
            }
            ExtractionStyle::RotatedCnot => {
                let steps = ordered
                    .into_iter()
                    .map(|slot| {
                        slot.map(|m| {
                            let rotation = match m.operator.pauli {
                                Pauli::X => Some(Gate::H),
                                Pauli::Y => Some(Gate::HYZ),
                                _ => None,
                            };
                            Interaction {
                                data: m.qubit.clone(),
                                gate: Gate::CX,
                                ancilla_is_control: false,
                                pre_rotation: rotation,
                                post_rotation: rotation,
                            }
                        })
                    })
                    .collect();
                Ok(ExtractionPlan {
                    ancilla_state: State::Zero,
                    measurement_basis: Pauli::Z,
                    steps,
                })
            }
        }
    }
}
