//! Per-tick qubit occupancy used for tick allocation

use crate::code::Qubit;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
struct TickSlot {
    occupied: HashSet<Qubit>,
    live: HashSet<Qubit>,
}

/// Growable grid of per-tick qubit states
///
/// A qubit is `occupied` in a tick when a gate acts on it there and `live`
/// while it holds quantum state (from its reset until the tick it is
/// measured out in).
/// The grid grows one tick at a time; a new tick inherits the live set of
/// the tick before it.
#[derive(Debug, Clone, Default)]
pub struct TickGrid {
    ticks: Vec<TickSlot>,
}

impl TickGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    fn extend_to(&mut self, tick: usize) {
        while self.ticks.len() <= tick {
            let live = self
                .ticks
                .last()
                .map(|slot| slot.live.clone())
                .unwrap_or_default();
            self.ticks.push(TickSlot {
                occupied: HashSet::new(),
                live,
            });
        }
    }

    /// Whether no gate acts on `qubit` in `tick`; ticks past the end are free
    pub fn is_free(&self, tick: usize, qubit: &Qubit) -> bool {
        self.ticks
            .get(tick)
            .map_or(true, |slot| !slot.occupied.contains(qubit))
    }

    pub fn occupy(&mut self, tick: usize, qubit: &Qubit) {
        self.extend_to(tick);
        self.ticks[tick].occupied.insert(qubit.clone());
    }

    /// Mark `qubit` live (or dead) from `tick` onwards
    pub fn set_live(&mut self, tick: usize, qubit: &Qubit, live: bool) {
        self.extend_to(tick);
        for slot in &mut self.ticks[tick..] {
            if live {
                slot.live.insert(qubit.clone());
            } else {
                slot.live.remove(qubit);
            }
        }
    }

    pub fn is_live(&self, tick: usize, qubit: &Qubit) -> bool {
        self.ticks
            .get(tick)
            .or_else(|| self.ticks.last())
            .map_or(false, |slot| slot.live.contains(qubit))
    }

    /// Earliest tick at or after `from` where every qubit is free
    pub fn earliest_free(&self, from: usize, qubits: &[&Qubit]) -> usize {
        (from..)
            .find(|tick| qubits.iter().all(|q| self.is_free(*tick, q)))
            .unwrap_or(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_and_search() {
        let mut grid = TickGrid::new();
        let (a, b) = (Qubit::at(&[0]), Qubit::at(&[1]));
        grid.occupy(0, &a);
        grid.occupy(1, &b);
        assert!(!grid.is_free(0, &a));
        assert!(grid.is_free(0, &b));
        assert_eq!(grid.earliest_free(0, &[&a, &b]), 2);
        assert_eq!(grid.earliest_free(0, &[&b]), 0);
        assert!(grid.is_free(10, &a));
    }

    #[test]
    fn test_live_set_copied_forward() {
        let mut grid = TickGrid::new();
        let q = Qubit::at(&[0]);
        grid.set_live(1, &q, true);
        assert!(!grid.is_live(0, &q));
        grid.occupy(5, &Qubit::at(&[9]));
        assert!(grid.is_live(5, &q));
        grid.set_live(3, &q, false);
        assert!(grid.is_live(2, &q));
        assert!(!grid.is_live(4, &q));
    }
}
