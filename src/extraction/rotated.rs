//! Table-driven orderer for rotated-lattice layouts

use crate::code::{Check, CheckMember, Coordinates, Pauli};
use crate::extraction::InteractionOrderer;
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};

/// One table entry: a data qubit at `offset` in a `pauli` check goes in `slot`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSlot {
    pub pauli: Pauli,
    pub offset: Coordinates,
    pub slot: usize,
}

/// Orders interactions by each member's offset from the check anchor
///
/// Only pure X or pure Z checks are accepted. Slots with no member become
/// idle steps, so weight-2 boundary checks keep the same timing as bulk ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotatedLatticeOrderer {
    pub slots: Vec<OrderSlot>,
}

impl RotatedLatticeOrderer {
    pub fn new(slots: Vec<OrderSlot>) -> Self {
        Self { slots }
    }

    /// The usual hook-safe order: X checks sweep NW, NE, SW, SE; Z checks NW, SW, NE, SE
    pub fn standard() -> Self {
        let (nw, ne, sw, se) = ([-1, -1], [1, -1], [-1, 1], [1, 1]);
        let mut slots = Vec::with_capacity(8);
        for (slot, offset) in [nw, ne, sw, se].into_iter().enumerate() {
            slots.push(OrderSlot {
                pauli: Pauli::X,
                offset: offset.into(),
                slot,
            });
        }
        for (slot, offset) in [nw, sw, ne, se].into_iter().enumerate() {
            slots.push(OrderSlot {
                pauli: Pauli::Z,
                offset: offset.into(),
                slot,
            });
        }
        Self { slots }
    }

    fn slot_of(&self, pauli: Pauli, offset: &Coordinates) -> Option<usize> {
        self.slots
            .iter()
            .find(|entry| entry.pauli == pauli && &entry.offset == offset)
            .map(|entry| entry.slot)
    }

    fn slot_count(&self, pauli: Pauli) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.pauli == pauli)
            .map(|entry| entry.slot + 1)
            .max()
            .unwrap_or(0)
    }
}

impl Default for RotatedLatticeOrderer {
    fn default() -> Self {
        Self::standard()
    }
}

impl InteractionOrderer for RotatedLatticeOrderer {
    fn order<'a>(&self, check: &'a Check) -> Result<Vec<Option<&'a CheckMember>>> {
        let pauli = match check.pure_letter() {
            Some(p @ (Pauli::X | Pauli::Z)) => p,
            _ => {
                return Err(QecError::extraction(format!(
                    "rotated lattice ordering needs a pure X or Z check, got {}",
                    check.word()
                )))
            }
        };

        let mut ordered = vec![None; self.slot_count(pauli)];
        for member in check.members() {
            let slot = self.slot_of(pauli, &member.offset).ok_or_else(|| {
                QecError::extraction(format!(
                    "no {} slot for offset {} in check {}",
                    pauli, member.offset, check
                ))
            })?;
            if ordered[slot].replace(member).is_some() {
                return Err(QecError::extraction(format!(
                    "two members of check {} share slot {}",
                    check, slot
                )));
            }
        }
        Ok(ordered)
    }
}
