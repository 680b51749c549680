//! Tick-structured circuit store and measurement record
//!
//! The compiler writes gates, noise and annotations into numbered ticks in
//! whatever order it resolves them; [`Circuit::emit`] linearises the store
//! into a [`Program`] and only then turns measurement references into
//! relative record offsets.

pub mod instruction;
pub mod output;
pub mod parser;

pub use instruction::*;
pub use output::*;
pub use parser::*;

use crate::code::{CheckRef, Pauli, Qubit};
use crate::{QecError, Result};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;

/// A check outcome in a given absolute round
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasurementKey {
    pub check: CheckRef,
    pub round: i64,
}

impl MeasurementKey {
    pub fn new(check: CheckRef, round: i64) -> Self {
        Self { check, round }
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ round {}", self.check, self.round)
    }
}

/// Opaque handle to an entry of the measurement record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeasurementRef(usize);

impl MeasurementRef {
    /// Position in the record (compile order, not program order)
    pub fn position(&self) -> usize {
        self.0
    }
}

/// Append-only list of measurements in the order they were compiled
#[derive(Debug, Clone, Default)]
pub struct MeasurementRecord {
    entries: Vec<(MeasurementKey, usize)>,
    index: HashMap<MeasurementKey, MeasurementRef>,
}

impl MeasurementRecord {
    /// Append a measurement made at `tick`; returns the new record length
    pub fn record(&mut self, key: MeasurementKey, tick: usize) -> usize {
        let reference = MeasurementRef(self.entries.len());
        self.index.insert(key.clone(), reference);
        self.entries.push((key, tick));
        self.entries.len()
    }

    /// Handle for a recorded measurement
    pub fn reference(&self, key: &MeasurementKey) -> Result<MeasurementRef> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| QecError::UnknownMeasurement(key.to_string()))
    }

    pub fn contains(&self, key: &MeasurementKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn tick_of(&self, reference: MeasurementRef) -> usize {
        self.entries[reference.0].1
    }

    pub fn key_of(&self, reference: MeasurementRef) -> &MeasurementKey {
        &self.entries[reference.0].0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether noise acts before or after the gates of its tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoisePlacement {
    Before,
    After,
}

/// Noise instruction stored in a tick
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseOp {
    pub channel: NoiseChannel,
    pub parameters: SmallVec<[f64; 3]>,
    pub targets: SmallVec<[usize; 2]>,
}

/// Gate or measurement stored in a tick
#[derive(Debug, Clone, PartialEq)]
pub struct GateOp {
    pub gate: Gate,
    pub flip: Option<f64>,
    pub target: GateTarget,
    pub measurement: Option<MeasurementRef>,
}

/// Targets of one gate application
#[derive(Debug, Clone, PartialEq)]
pub enum GateTarget {
    Qubits(SmallVec<[usize; 2]>),
    Product(SmallVec<[(Pauli, usize); 4]>),
}

impl GateTarget {
    fn qubits(&self) -> SmallVec<[usize; 4]> {
        match self {
            GateTarget::Qubits(qubits) => qubits.iter().copied().collect(),
            GateTarget::Product(factors) => factors.iter().map(|(_, q)| *q).collect(),
        }
    }
}

/// Detector or observable annotation, still in terms of record handles
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Detector(Vec<MeasurementRef>),
    ObservableInclude {
        index: usize,
        measurements: Vec<MeasurementRef>,
    },
}

/// Contents of one tick
#[derive(Debug, Clone, Default)]
pub struct Tick {
    pub pre_noise: Vec<NoiseOp>,
    pub gates: Vec<GateOp>,
    pub post_noise: Vec<NoiseOp>,
    pub annotations: Vec<Annotation>,
    busy: HashSet<usize>,
}

impl Tick {
    /// Qubit indices acted on by a gate in this tick
    pub fn busy(&self) -> &HashSet<usize> {
        &self.busy
    }
}

/// Repeated tick region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatRegion {
    pub ticks: Range<usize>,
    pub repetitions: usize,
}

/// Passive tick store written by the compiler
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    ticks: Vec<Tick>,
    qubits: Vec<Qubit>,
    indices: HashMap<Qubit, usize>,
    record: MeasurementRecord,
    repeat: Option<RepeatRegion>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of a qubit, assigned on first use
    pub fn qubit_index(&mut self, qubit: &Qubit) -> usize {
        if let Some(index) = self.indices.get(qubit) {
            return *index;
        }
        let index = self.qubits.len();
        self.qubits.push(qubit.clone());
        self.indices.insert(qubit.clone(), index);
        index
    }

    /// Qubits in index order
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Number of ticks allocated so far
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn record(&self) -> &MeasurementRecord {
        &self.record
    }

    pub fn repeat_region(&self) -> Option<&RepeatRegion> {
        self.repeat.as_ref()
    }

    fn tick_mut(&mut self, tick: usize) -> &mut Tick {
        if tick >= self.ticks.len() {
            self.ticks.resize_with(tick + 1, Tick::default);
        }
        &mut self.ticks[tick]
    }

    fn claim(&mut self, tick: usize, target: &GateTarget) -> Result<()> {
        let qubits = target.qubits();
        let slot = self.tick_mut(tick);
        if let Some(qubit) = qubits.iter().find(|q| slot.busy.contains(*q)) {
            return Err(QecError::Conflict {
                tick,
                qubit: *qubit,
            });
        }
        slot.busy.extend(qubits);
        Ok(())
    }

    /// Add a unitary or reset gate
    pub fn add_gate(&mut self, tick: usize, gate: Gate, targets: &[&Qubit]) -> Result<()> {
        let target = GateTarget::Qubits(targets.iter().map(|q| self.qubit_index(q)).collect());
        self.claim(tick, &target)?;
        self.tick_mut(tick).gates.push(GateOp {
            gate,
            flip: None,
            target,
            measurement: None,
        });
        Ok(())
    }

    /// Add a single-qubit measurement and record it under `key`
    pub fn add_measurement(
        &mut self,
        tick: usize,
        gate: Gate,
        qubit: &Qubit,
        flip: Option<f64>,
        key: MeasurementKey,
    ) -> Result<MeasurementRef> {
        let target = GateTarget::Qubits(SmallVec::from_slice(&[self.qubit_index(qubit)]));
        self.push_measurement(tick, gate, target, flip, key)
    }

    /// Add a Pauli-product measurement and record it under `key`
    pub fn add_product_measurement(
        &mut self,
        tick: usize,
        factors: &[(Qubit, Pauli)],
        flip: Option<f64>,
        key: MeasurementKey,
    ) -> Result<MeasurementRef> {
        let target = GateTarget::Product(
            factors
                .iter()
                .map(|(q, p)| (*p, self.qubit_index(q)))
                .collect(),
        );
        self.push_measurement(tick, Gate::MPP, target, flip, key)
    }

    fn push_measurement(
        &mut self,
        tick: usize,
        gate: Gate,
        target: GateTarget,
        flip: Option<f64>,
        key: MeasurementKey,
    ) -> Result<MeasurementRef> {
        self.claim(tick, &target)?;
        self.record_measurement(key.clone(), tick);
        let reference = self.record.reference(&key)?;
        self.tick_mut(tick).gates.push(GateOp {
            gate,
            flip,
            target,
            measurement: Some(reference),
        });
        Ok(reference)
    }

    /// Append to the measurement record; returns the new record length
    pub fn record_measurement(&mut self, key: MeasurementKey, tick: usize) -> usize {
        self.record.record(key, tick)
    }

    /// Handle for the outcome of `check` in `round`
    pub fn reference(&self, check: &CheckRef, round: i64) -> Result<MeasurementRef> {
        self.record
            .reference(&MeasurementKey::new(check.clone(), round))
    }

    /// Add a noise channel before or after the gates of `tick`
    pub fn add_noise(
        &mut self,
        tick: usize,
        placement: NoisePlacement,
        channel: NoiseChannel,
        parameters: &[f64],
        targets: &[&Qubit],
    ) {
        let op = NoiseOp {
            channel,
            parameters: SmallVec::from_slice(parameters),
            targets: targets.iter().map(|q| self.qubit_index(q)).collect(),
        };
        let slot = self.tick_mut(tick);
        match placement {
            NoisePlacement::Before => slot.pre_noise.push(op),
            NoisePlacement::After => slot.post_noise.push(op),
        }
    }

    /// Attach a detector or observable annotation to `tick`
    pub fn add_annotation(&mut self, tick: usize, annotation: Annotation) {
        self.tick_mut(tick).annotations.push(annotation);
    }

    /// Mark a tick range to be emitted once inside a repeat block
    pub fn mark_repeat(&mut self, ticks: Range<usize>, repetitions: usize) -> Result<()> {
        if ticks.is_empty() || ticks.end > self.ticks.len() {
            return Err(QecError::invalid_request(format!(
                "repeat range {:?} outside the {} allocated ticks",
                ticks,
                self.ticks.len()
            )));
        }
        self.repeat = Some(RepeatRegion { ticks, repetitions });
        Ok(())
    }

    /// Measurements in the ticks of `range`, in the order they will be emitted
    pub fn measurement_order(&self, range: Range<usize>) -> Vec<MeasurementRef> {
        self.ticks[range.start.min(self.ticks.len())..range.end.min(self.ticks.len())]
            .iter()
            .flat_map(|tick| {
                grouped_gates(&tick.gates)
                    .into_iter()
                    .flat_map(|(_, ops)| ops.into_iter().filter_map(|op| op.measurement))
            })
            .collect()
    }
}

/// Gates grouped by `(gate, flip)` in first-appearance order
pub(crate) fn grouped_gates(gates: &[GateOp]) -> Vec<((Gate, Option<u64>), Vec<&GateOp>)> {
    let mut groups: Vec<((Gate, Option<u64>), Vec<&GateOp>)> = Vec::new();
    for op in gates {
        let key = (op.gate, op.flip.map(f64::to_bits));
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, ops)) => ops.push(op),
            None => groups.push((key, vec![op])),
        }
    }
    groups
}

/// Noise grouped by `(channel, parameters)` in first-appearance order
pub(crate) fn grouped_noise(noise: &[NoiseOp]) -> Vec<(&NoiseOp, Vec<usize>)> {
    let mut groups: Vec<(&NoiseOp, Vec<usize>)> = Vec::new();
    for op in noise {
        match groups
            .iter_mut()
            .find(|(head, _)| head.channel == op.channel && head.parameters == op.parameters)
        {
            Some((_, targets)) => targets.extend(op.targets.iter().copied()),
            None => groups.push((op, op.targets.to_vec())),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Check;
    use std::sync::Arc;

    fn z_check(i: i32) -> CheckRef {
        Arc::new(Check::from_letters(&[(Qubit::at(&[i]), Pauli::Z)], None).unwrap())
    }

    #[test]
    fn test_conflicting_gate_rejected() {
        let mut circuit = Circuit::new();
        let (a, b) = (Qubit::at(&[0]), Qubit::at(&[1]));
        circuit.add_gate(0, Gate::R, &[&a]).unwrap();
        circuit.add_gate(0, Gate::R, &[&b]).unwrap();
        let err = circuit.add_gate(0, Gate::CX, &[&a, &b]).unwrap_err();
        assert_eq!(err, QecError::Conflict { tick: 0, qubit: 0 });
        assert!(circuit.add_gate(1, Gate::CX, &[&a, &b]).is_ok());
    }

    #[test]
    fn test_record_and_reference() {
        let mut circuit = Circuit::new();
        let check = z_check(0);
        let q = Qubit::at(&[0]);
        assert!(matches!(
            circuit.reference(&check, 0),
            Err(QecError::UnknownMeasurement(_))
        ));
        circuit
            .add_measurement(2, Gate::M, &q, None, MeasurementKey::new(check.clone(), 0))
            .unwrap();
        let reference = circuit.reference(&check, 0).unwrap();
        assert_eq!(circuit.record().tick_of(reference), 2);
        assert_eq!(circuit.len(), 3);
        assert_eq!(
            circuit.record_measurement(MeasurementKey::new(check, 1), 3),
            2
        );
    }

    #[test]
    fn test_measurement_order_follows_grouping() {
        let mut circuit = Circuit::new();
        let (a, b, c) = (z_check(0), z_check(1), z_check(2));
        let (qa, qb, qc) = (Qubit::at(&[0]), Qubit::at(&[1]), Qubit::at(&[2]));
        let ra = circuit
            .add_measurement(0, Gate::M, &qa, None, MeasurementKey::new(a, 0))
            .unwrap();
        let rb = circuit
            .add_measurement(0, Gate::MX, &qb, None, MeasurementKey::new(b, 0))
            .unwrap();
        let rc = circuit
            .add_measurement(0, Gate::M, &qc, None, MeasurementKey::new(c, 0))
            .unwrap();
        assert_eq!(circuit.measurement_order(0..1), vec![ra, rc, rb]);
    }

    #[test]
    fn test_repeat_range_checked() {
        let mut circuit = Circuit::new();
        circuit.add_gate(0, Gate::R, &[&Qubit::at(&[0])]).unwrap();
        assert!(circuit.mark_repeat(0..3, 2).is_err());
        assert!(circuit.mark_repeat(0..1, 2).is_ok());
    }
}
