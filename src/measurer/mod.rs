//! Detector and observable resolution
//!
//! The [`Measurer`] owns a per-compilation [`ResolverState`]. Detector
//! instances are created at the start of each round, wait for their
//! constituent measurements, and are written into the circuit as soon as
//! the last one is recorded. Observable trackers follow each requested
//! logical operator through the schedule.

pub mod observable;

pub use observable::*;

use crate::circuit::{Annotation, Circuit, MeasurementKey, MeasurementRef};
use crate::code::{CheckRef, Code, Pauli, PauliProduct, Qubit, State};
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Lifecycle of a detector instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorState {
    /// Waiting for constituent measurements
    Pending,
    /// All constituents recorded, annotation not yet written
    Triggered,
    /// Annotation written
    Resolved,
}

/// Position of a detector in the code's detector schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub round: usize,
    pub index: usize,
}

/// One occurrence of a schedule detector
#[derive(Debug, Clone)]
pub struct DetectorInstance {
    pub entry: ScheduleEntry,
    /// Absolute round of the detector's `end`
    pub round: i64,
    pub constituents: Vec<MeasurementKey>,
    pub state: DetectorState,
    pending: usize,
}

/// Mutable resolution bookkeeping for a single compilation
#[derive(Debug, Clone, Default)]
pub struct ResolverState {
    instances: Vec<DetectorInstance>,
    triggers: HashMap<MeasurementKey, Vec<usize>>,
    discarded: usize,
}

impl ResolverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> &[DetectorInstance] {
        &self.instances
    }

    /// Resolved detector count per schedule entry
    pub fn report(&self) -> BTreeMap<ScheduleEntry, usize> {
        let mut counts = BTreeMap::new();
        for instance in &self.instances {
            if instance.state == DetectorState::Resolved {
                *counts.entry(instance.entry).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Instances dropped at the open time boundary
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn resolved(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.state == DetectorState::Resolved)
            .count()
    }
}

/// Keep keys appearing an odd number of times, in first-appearance order
fn cancel_pairs<T: Clone + Eq + std::hash::Hash>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut order = Vec::new();
    for item in items {
        let count = counts.entry(item.clone()).or_insert(0);
        if *count == 0 {
            order.push(item.clone());
        }
        *count += 1;
    }
    order.into_iter().filter(|item| counts[item] % 2 == 1).collect()
}

/// Resolves detectors and observables into circuit annotations
#[derive(Debug, Clone)]
pub struct Measurer {
    state: ResolverState,
    initial_states: BTreeMap<Qubit, State>,
    trackers: Vec<ObservableTracker>,
}

impl Measurer {
    pub fn new(initial_states: BTreeMap<Qubit, State>, trackers: Vec<ObservableTracker>) -> Self {
        Self {
            state: ResolverState::new(),
            initial_states,
            trackers,
        }
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    fn initial_state(&self, qubit: &Qubit) -> State {
        self.initial_states.get(qubit).copied().unwrap_or_default()
    }

    /// Whether the initial data states are eigenstates of `product`
    fn stabilised_initially(&self, product: &PauliProduct) -> bool {
        product
            .factors()
            .all(|(qubit, letter)| self.initial_state(qubit).basis() == letter)
    }

    /// Instantiate the detectors closing in absolute round `round`
    pub fn begin_round(&mut self, code: &Code, round: usize, circuit: &mut Circuit) -> Result<()> {
        let schedule_round = round % code.schedule_length();
        for (index, detector) in code.detectors_in_round(round).iter().enumerate() {
            let entry = ScheduleEntry {
                round: schedule_round,
                index,
            };
            let all = detector.triggers(round as i64);
            let truncated = all.iter().any(|(_, r)| *r < 0);
            let constituents = cancel_pairs(
                all.into_iter()
                    .filter(|(_, r)| *r >= 0)
                    .map(|(check, r)| MeasurementKey::new(check, r)),
            );

            if truncated {
                let mut product = PauliProduct::identity();
                for key in &constituents {
                    product.multiply(key.check.product());
                }
                if constituents.is_empty() || !self.stabilised_initially(&product) {
                    debug!(
                        round,
                        index,
                        product = %product,
                        "discarding boundary detector not fixed by the initial state"
                    );
                    self.state.discarded += 1;
                    continue;
                }
            }

            let id = self.state.instances.len();
            let mut pending = 0;
            for key in &constituents {
                if !circuit.record().contains(key) {
                    pending += 1;
                    self.state.triggers.entry(key.clone()).or_default().push(id);
                }
            }
            self.state.instances.push(DetectorInstance {
                entry,
                round: round as i64,
                constituents,
                state: DetectorState::Pending,
                pending,
            });
            if pending == 0 {
                self.trigger(id, circuit)?;
            }
        }
        Ok(())
    }

    /// Notify that `key` has just been recorded
    pub fn on_measurement(&mut self, key: &MeasurementKey, circuit: &mut Circuit) -> Result<()> {
        let Some(ids) = self.state.triggers.remove(key) else {
            return Ok(());
        };
        for id in ids {
            let instance = &mut self.state.instances[id];
            instance.pending -= 1;
            if instance.pending == 0 {
                self.trigger(id, circuit)?;
            }
        }
        Ok(())
    }

    fn trigger(&mut self, id: usize, circuit: &mut Circuit) -> Result<()> {
        self.state.instances[id].state = DetectorState::Triggered;
        let references = self.references(&self.state.instances[id].constituents, circuit)?;
        place_detector(references, circuit);
        self.state.instances[id].state = DetectorState::Resolved;
        Ok(())
    }

    fn references(&self, keys: &[MeasurementKey], circuit: &Circuit) -> Result<Vec<MeasurementRef>> {
        keys.iter()
            .map(|key| {
                circuit
                    .record()
                    .reference(key)
                    .map_err(|_| QecError::NotYetMeasured(key.to_string()))
            })
            .collect()
    }

    /// Fold round `round` into every observable tracker
    pub fn end_round(&mut self, code: &Code, round: usize, circuit: &Circuit) -> Result<()> {
        for tracker in &mut self.trackers {
            tracker.advance(code, round, circuit)?;
        }
        Ok(())
    }

    /// Write pending observable toggles at `tick`
    pub fn flush_observables(&mut self, tick: usize, circuit: &mut Circuit) {
        for tracker in &mut self.trackers {
            let measurements = tracker.take_pending();
            if !measurements.is_empty() {
                circuit.add_annotation(
                    tick,
                    Annotation::ObservableInclude {
                        index: tracker.index(),
                        measurements,
                    },
                );
            }
        }
    }

    /// Detectors comparing each check's last outcome with the final data measurements
    pub fn final_detectors(
        &mut self,
        code: &Code,
        last_round: usize,
        finals: &BTreeMap<Qubit, (Pauli, MeasurementRef)>,
        circuit: &mut Circuit,
    ) -> Result<usize> {
        let length = code.schedule_length();
        let first_round = (last_round + 1).saturating_sub(length);
        let mut placed = 0;

        for check in code.distinct_checks() {
            let covered = check.members().iter().all(|m| {
                finals
                    .get(&m.qubit)
                    .map_or(false, |(letter, _)| *letter == m.operator.pauli)
            });
            if !covered {
                continue;
            }
            let Some(measured) = last_occurrence(code, &check, first_round, last_round) else {
                continue;
            };
            let disturbed = (measured + 1..=last_round)
                .flat_map(|r| code.checks_in_round(r))
                .any(|later| !check.commutes_with(later));
            if disturbed {
                continue;
            }

            let last = circuit
                .reference(&check, measured as i64)
                .map_err(|_| QecError::NotYetMeasured(format!("{} @ round {}", check, measured)))?;
            let references = cancel_pairs(
                std::iter::once(last).chain(check.qubits().map(|q| finals[q].1)),
            );
            if references.is_empty() {
                continue;
            }
            place_detector(references, circuit);
            placed += 1;
        }
        Ok(placed)
    }

    /// Close every observable with the final data measurements on its support
    pub fn final_observables(
        &mut self,
        total_rounds: usize,
        finals: &BTreeMap<Qubit, (Pauli, MeasurementRef)>,
        circuit: &mut Circuit,
    ) -> Result<()> {
        for tracker in &mut self.trackers {
            tracker.close(total_rounds, finals)?;
            let measurements = tracker.take_pending();
            if measurements.is_empty() {
                continue;
            }
            let tick = measurements
                .iter()
                .map(|r| circuit.record().tick_of(*r))
                .max()
                .unwrap_or(0);
            circuit.add_annotation(
                tick,
                Annotation::ObservableInclude {
                    index: tracker.index(),
                    measurements,
                },
            );
        }
        Ok(())
    }

    /// Fail if any detector is still waiting for a measurement
    pub fn finish(self) -> Result<ResolverState> {
        if let Some(instance) = self
            .state
            .instances
            .iter()
            .find(|i| i.state != DetectorState::Resolved)
        {
            return Err(QecError::NotYetMeasured(format!(
                "detector {:?} ending in round {} never resolved",
                instance.entry, instance.round
            )));
        }
        Ok(self.state)
    }
}

/// Latest round in `first..=last` that measures `check`
fn last_occurrence(code: &Code, check: &CheckRef, first: usize, last: usize) -> Option<usize> {
    (first..=last)
        .rev()
        .find(|r| code.checks_in_round(*r).contains(check))
}

/// Annotate in the tick of the latest constituent
fn place_detector(references: Vec<MeasurementRef>, circuit: &mut Circuit) {
    let tick = references
        .iter()
        .map(|r| circuit.record().tick_of(*r))
        .max()
        .unwrap_or(0);
    circuit.add_annotation(tick, Annotation::Detector(references));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Gate;
    use crate::code::{CodeBuilder, Pauli};

    fn repetition() -> (Code, CheckRef) {
        let mut builder = CodeBuilder::new().data_qubits([Qubit::at(&[0]), Qubit::at(&[2])]);
        let zz = builder
            .check_from_letters(
                &[(Qubit::at(&[0]), Pauli::Z), (Qubit::at(&[2]), Pauli::Z)],
                Some(Qubit::at(&[1])),
            )
            .unwrap();
        let code = builder
            .round(vec![zz.clone()])
            .with_repeated_detectors()
            .unwrap()
            .build()
            .unwrap();
        (code, zz)
    }

    fn measure(circuit: &mut Circuit, measurer: &mut Measurer, check: &CheckRef, round: i64, tick: usize) {
        let key = MeasurementKey::new(check.clone(), round);
        circuit
            .add_measurement(tick, Gate::M, &Qubit::at(&[1]), None, key.clone())
            .unwrap();
        measurer.on_measurement(&key, circuit).unwrap();
    }

    #[test]
    fn test_cancel_pairs() {
        assert_eq!(cancel_pairs([1, 2, 1, 3, 1]), vec![1, 2, 3]);
        assert_eq!(cancel_pairs([4, 4]), Vec::<i32>::new());
    }

    #[test]
    fn test_open_lid_detector_kept_for_eigenstate() {
        let (code, zz) = repetition();
        let mut circuit = Circuit::new();
        let mut measurer = Measurer::new(BTreeMap::new(), vec![]);

        measurer.begin_round(&code, 0, &mut circuit).unwrap();
        assert_eq!(measurer.state().instances().len(), 1);
        measure(&mut circuit, &mut measurer, &zz, 0, 3);
        assert_eq!(measurer.state().resolved(), 1);

        measurer.begin_round(&code, 1, &mut circuit).unwrap();
        measure(&mut circuit, &mut measurer, &zz, 1, 7);
        let state = measurer.finish().unwrap();
        assert_eq!(state.resolved(), 2);
        assert_eq!(state.report()[&ScheduleEntry { round: 0, index: 0 }], 2);

        let ticks = circuit.ticks();
        assert_eq!(ticks[3].annotations.len(), 1);
        assert_eq!(ticks[7].annotations.len(), 1);
    }

    #[test]
    fn test_open_lid_detector_discarded_for_wrong_basis() {
        let (code, _) = repetition();
        let mut circuit = Circuit::new();
        let initial: BTreeMap<_, _> = [(Qubit::at(&[0]), State::Plus), (Qubit::at(&[2]), State::Plus)]
            .into_iter()
            .collect();
        let mut measurer = Measurer::new(initial, vec![]);
        measurer.begin_round(&code, 0, &mut circuit).unwrap();
        assert!(measurer.state().instances().is_empty());
        assert_eq!(measurer.state().discarded(), 1);
    }

    #[test]
    fn test_unresolved_detector_reported() {
        let (code, _) = repetition();
        let mut circuit = Circuit::new();
        let mut measurer = Measurer::new(BTreeMap::new(), vec![]);
        measurer.begin_round(&code, 0, &mut circuit).unwrap();
        assert!(matches!(measurer.finish(), Err(QecError::NotYetMeasured(_))));
    }
}
