//! Per-compilation scheduling state and the tick allocation rules

use crate::circuit::{Circuit, Gate, MeasurementKey, MeasurementRef, NoisePlacement};
use crate::code::{Check, CheckRef, Code, Pauli, Qubit, State};
use crate::compiler::{CompileReport, CompileRequest, Compiler, CompilerConfig, TickGrid};
use crate::extraction::{ExtractionPlan, SyndromeExtractor};
use crate::measurer::{Measurer, ObservableTracker};
use crate::noise::NoiseConfig;
use crate::{QecError, Result};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, warn};

/// Gate taking |0> to `state`, applied one tick after the reset
fn preparation(state: State) -> Option<Gate> {
    match state {
        State::Zero => None,
        State::One => Some(Gate::X),
        State::Plus => Some(Gate::H),
        State::Minus => Some(Gate::SqrtYDag),
        State::PlusI => Some(Gate::SqrtXDag),
        State::MinusI => Some(Gate::SqrtX),
    }
}

/// Last direct single-qubit measurement of a data qubit
#[derive(Debug, Clone, Copy)]
struct DirectMeasurement {
    basis: Pauli,
    reference: MeasurementRef,
    round: usize,
    tick: usize,
}

/// A check measured through its ancilla, with its plan
struct Extracted<'a> {
    check: &'a CheckRef,
    ancilla: &'a Qubit,
    plan: ExtractionPlan,
}

/// Reject rounds where two checks need the same qubit in the same slot
fn check_slot_conflicts(extracted: &[Extracted<'_>]) -> Result<()> {
    let mut users: HashMap<(usize, &Qubit), &CheckRef> = HashMap::new();
    for e in extracted {
        for (slot, step) in e.plan.steps.iter().enumerate() {
            let qubits = std::iter::once(e.ancilla).chain(step.as_ref().map(|i| &i.data));
            for qubit in qubits {
                if let Some(other) = users.insert((slot, qubit), e.check) {
                    return Err(QecError::extraction(format!(
                        "checks {} and {} both use qubit {} in interaction slot {}",
                        other, e.check, qubit, slot
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Everything mutable during one `compile` call
pub(crate) struct Session<'a> {
    code: &'a Code,
    request: &'a CompileRequest,
    noise: &'a NoiseConfig,
    extractor: &'a SyndromeExtractor,
    config: &'a CompilerConfig,
    circuit: Circuit,
    grid: TickGrid,
    measurer: Measurer,
    /// Last tick any gate touched each qubit
    last_op: HashMap<Qubit, usize>,
    /// Ancillas never go back into gaps: first tick after their last use
    ancilla_floor: HashMap<Qubit, usize>,
    /// Data qubits must stay after their previous round's operations
    data_floor: HashMap<Qubit, usize>,
    /// First tick each data qubit is touched in the current round
    round_first_op: HashMap<Qubit, usize>,
    direct: HashMap<Qubit, DirectMeasurement>,
    layer_start: usize,
    rounds: usize,
}

impl<'a> Session<'a> {
    pub(crate) fn new(compiler: &'a Compiler, code: &'a Code, request: &'a CompileRequest) -> Self {
        let trackers = request
            .logical_observables
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, logical)| ObservableTracker::new(index, logical))
            .collect();
        Self {
            code,
            request,
            noise: compiler.noise(),
            extractor: compiler.extractor(),
            config: compiler.config(),
            circuit: Circuit::new(),
            grid: TickGrid::new(),
            measurer: Measurer::new(request.initial_states.clone(), trackers),
            last_op: HashMap::new(),
            ancilla_floor: HashMap::new(),
            data_floor: HashMap::new(),
            round_first_op: HashMap::new(),
            direct: HashMap::new(),
            layer_start: 0,
            rounds: 0,
        }
    }

    pub(crate) fn run(mut self) -> Result<(Circuit, CompileReport)> {
        let code = self.code;
        // Surface extraction errors before any tick is allocated.
        for round in 0..code.schedule_length() {
            check_slot_conflicts(&self.extract_round(round)?)?;
        }

        self.initialise_data()?;

        let layers = self.request.layers;
        let mut repeated = false;
        let first = self.compile_layer()?;
        if layers >= 3 {
            let middle = self.compile_layer()?;
            let repeatable = !middle.is_empty() && self.same_measurements(&first, &middle);
            if self.config.repeat_middle_layers && repeatable {
                self.circuit.mark_repeat(middle, layers - 2)?;
                repeated = true;
            } else {
                if self.config.repeat_middle_layers {
                    warn!(
                        layers = layers - 2,
                        "middle layer measures differently from the first layer, unrolling"
                    );
                }
                for _ in 0..layers - 3 {
                    self.compile_layer()?;
                }
            }
        }
        if layers >= 2 {
            self.compile_layer()?;
        }

        let final_detectors = self.measure_finals()?;

        let report_rounds = self.rounds;
        let ticks = self.barrier();
        let measurements = self.circuit.record().len();
        let state = self.measurer.finish()?;
        let report = CompileReport {
            layers,
            compiled_rounds: report_rounds,
            ticks,
            measurements,
            detectors: state.report().into_iter().collect(),
            final_detectors,
            discarded_detectors: state.discarded(),
            repeated,
        };
        Ok((self.circuit, report))
    }

    /// First tick after everything allocated so far
    fn barrier(&self) -> usize {
        self.grid.len().max(self.circuit.len())
    }

    fn initial_state(&self, qubit: &Qubit) -> State {
        self.request
            .initial_states
            .get(qubit)
            .copied()
            .unwrap_or_default()
    }

    fn initialise_data(&mut self) -> Result<()> {
        let code = self.code;
        for qubit in code.data_qubits() {
            self.reset(0, qubit)?;
        }
        for qubit in code.data_qubits() {
            if let Some(gate) = preparation(self.initial_state(qubit)) {
                self.single(1, gate, qubit)?;
            }
        }
        Ok(())
    }

    /// Extraction plans for the ancilla checks of `round`, in schedule order
    fn extract_round(&self, round: usize) -> Result<Vec<Extracted<'a>>> {
        let code: &'a Code = self.code;
        code.checks_in_round(round)
            .iter()
            .filter_map(|check| check.ancilla().map(|ancilla| (check, ancilla)))
            .map(|(check, ancilla)| -> Result<Extracted<'a>> {
                Ok(Extracted {
                    check,
                    ancilla,
                    plan: self.extractor.extract(check)?,
                })
            })
            .collect()
    }

    fn touch(&mut self, qubit: &Qubit, tick: usize) {
        let last = self.last_op.entry(qubit.clone()).or_insert(tick);
        *last = (*last).max(tick);
        if self.code.is_data_qubit(qubit) {
            let first = self.round_first_op.entry(qubit.clone()).or_insert(tick);
            *first = (*first).min(tick);
        }
    }

    fn reset(&mut self, tick: usize, qubit: &Qubit) -> Result<()> {
        self.circuit.add_gate(tick, Gate::R, &[qubit])?;
        self.grid.occupy(tick, qubit);
        self.grid.set_live(tick, qubit, true);
        let noise = self.noise;
        if let Some(spec) = &noise.initialisation {
            spec.apply(&mut self.circuit, tick, NoisePlacement::After, &[qubit], Pauli::Z);
        }
        self.touch(qubit, tick);
        Ok(())
    }

    fn single(&mut self, tick: usize, gate: Gate, qubit: &Qubit) -> Result<()> {
        self.circuit.add_gate(tick, gate, &[qubit])?;
        self.grid.occupy(tick, qubit);
        let noise = self.noise;
        if let Some(spec) = &noise.one_qubit_gate {
            spec.apply(&mut self.circuit, tick, NoisePlacement::After, &[qubit], Pauli::Z);
        }
        self.touch(qubit, tick);
        Ok(())
    }

    fn two(&mut self, tick: usize, gate: Gate, first: &Qubit, second: &Qubit) -> Result<()> {
        self.circuit.add_gate(tick, gate, &[first, second])?;
        self.grid.occupy(tick, first);
        self.grid.occupy(tick, second);
        let noise = self.noise;
        if let Some(spec) = &noise.two_qubit_gate {
            spec.apply(
                &mut self.circuit,
                tick,
                NoisePlacement::After,
                &[first, second],
                Pauli::Z,
            );
        }
        self.touch(first, tick);
        self.touch(second, tick);
        Ok(())
    }

    /// Compile one full period of the schedule starting at a barrier
    ///
    /// The first layer starts at tick 0 alongside the data resets.
    fn compile_layer(&mut self) -> Result<Range<usize>> {
        let start = if self.rounds == 0 { 0 } else { self.barrier() };
        self.layer_start = start;
        let first_round = self.rounds;
        for _ in 0..self.code.schedule_length() {
            self.compile_round(self.rounds)?;
            self.rounds += 1;
        }
        let end = self.barrier();
        if end > start {
            self.measurer.flush_observables(end - 1, &mut self.circuit);
        }
        debug!(
            first_round,
            ticks = end - start,
            start,
            "compiled layer"
        );
        Ok(start..end)
    }

    fn compile_round(&mut self, round: usize) -> Result<()> {
        let code = self.code;
        self.measurer.begin_round(code, round, &mut self.circuit)?;

        for qubit in code.data_qubits() {
            let floor = self.last_op.get(qubit).map_or(0, |t| t + 1);
            self.data_floor.insert(qubit.clone(), floor);
        }
        self.round_first_op.clear();

        let extracted = self.extract_round(round)?;
        self.schedule_extracted(&extracted, round)?;
        for check in code.checks_in_round(round) {
            if check.ancilla().is_none() {
                self.schedule_direct(check, round)?;
            }
        }

        self.round_noise();
        self.measurer.end_round(code, round, &self.circuit)
    }

    /// Place every ancilla check of a round on one shared slot grid
    ///
    /// Slot `k` of every check runs at `start + k * stride`, so the table
    /// order of the orderer is the order on every shared data qubit. The
    /// stride leaves room for data rotations on either side of a gate.
    fn schedule_extracted(&mut self, extracted: &[Extracted<'a>], round: usize) -> Result<()> {
        if extracted.is_empty() {
            return Ok(());
        }
        let interactions = move || {
            extracted
                .iter()
                .flat_map(|e| e.plan.steps.iter().enumerate())
                .filter_map(|(slot, step)| step.as_ref().map(|i| (slot, i)))
        };
        let pre = interactions().any(|(_, i)| i.pre_rotation.is_some()) as usize;
        let post = interactions().any(|(_, i)| i.post_rotation.is_some()) as usize;
        let stride = 1 + pre + post;

        let mut start = self.layer_start;
        for e in extracted {
            let floor = self
                .layer_start
                .max(self.ancilla_floor.get(e.ancilla).copied().unwrap_or(0));
            let reset = self.grid.earliest_free(floor, &[e.ancilla]);
            self.reset(reset, e.ancilla)?;
            let mut ready = reset + 1;
            if let Some(gate) = preparation(e.plan.ancilla_state) {
                let tick = self.grid.earliest_free(ready, &[e.ancilla]);
                self.single(tick, gate, e.ancilla)?;
                ready = tick + 1;
            }
            start = start.max(ready);
        }
        for (slot, interaction) in interactions() {
            let floor = self.data_floor.get(&interaction.data).copied().unwrap_or(0);
            let needed = floor + interaction.pre_rotation.is_some() as usize;
            start = start.max(needed.saturating_sub(slot * stride));
        }
        let start = (start..)
            .find(|&s| self.grid_fits(extracted, s, stride))
            .unwrap_or(start);
        debug!(round, start, stride, checks = extracted.len(), "interaction grid");

        for e in extracted {
            let mut next = start;
            for (slot, step) in e.plan.steps.iter().enumerate() {
                let tick = start + slot * stride;
                next = tick + 1;
                let Some(interaction) = step else {
                    continue;
                };
                let data = &interaction.data;
                if let Some(rotation) = interaction.pre_rotation {
                    self.single(tick - 1, rotation, data)?;
                }
                if interaction.ancilla_is_control {
                    self.two(tick, interaction.gate, e.ancilla, data)?;
                } else {
                    self.two(tick, interaction.gate, data, e.ancilla)?;
                }
                if let Some(rotation) = interaction.post_rotation {
                    self.single(tick + 1, rotation, data)?;
                }
            }
            self.measure_ancilla(e, next, round)?;
        }
        Ok(())
    }

    /// Whether every gate of the slot grid starting at `start` lands on free qubits
    fn grid_fits(&self, extracted: &[Extracted<'a>], start: usize, stride: usize) -> bool {
        extracted.iter().all(|e| {
            e.plan.steps.iter().enumerate().all(|(slot, step)| {
                let tick = start + slot * stride;
                let Some(interaction) = step else {
                    return true;
                };
                let data = &interaction.data;
                self.grid.is_free(tick, e.ancilla)
                    && self.grid.is_free(tick, data)
                    && (interaction.pre_rotation.is_none() || self.grid.is_free(tick - 1, data))
                    && (interaction.post_rotation.is_none() || self.grid.is_free(tick + 1, data))
            })
        })
    }

    fn measure_ancilla(&mut self, extracted: &Extracted<'a>, from: usize, round: usize) -> Result<()> {
        let ancilla = extracted.ancilla;
        let tick = self.grid.earliest_free(from, &[ancilla]);
        let key = MeasurementKey::new(extracted.check.clone(), round as i64);
        let gate = Gate::measure(extracted.plan.measurement_basis)?;
        self.circuit
            .add_measurement(tick, gate, ancilla, self.noise.measurement_flip(), key.clone())?;
        self.grid.occupy(tick, ancilla);
        self.grid.set_live(tick, ancilla, false);
        self.touch(ancilla, tick);
        self.ancilla_floor.insert(ancilla.clone(), tick + 1);
        self.measurer.on_measurement(&key, &mut self.circuit)
    }

    /// Ancilla-free check: one measurement instruction over all members
    fn schedule_direct(&mut self, check: &CheckRef, round: usize) -> Result<()> {
        let qubits: Vec<&Qubit> = check.qubits().collect();
        let floor = qubits
            .iter()
            .map(|q| self.data_floor.get(*q).copied().unwrap_or(0))
            .max()
            .unwrap_or(0)
            .max(self.layer_start);
        let tick = self.grid.earliest_free(floor, &qubits);
        let key = MeasurementKey::new(check.clone(), round as i64);
        let flip = self.noise.measurement_flip();

        let reference = if check.weight() == 1 {
            let member = &check.members()[0];
            let basis = member.operator.pauli;
            let reference = self.circuit.add_measurement(
                tick,
                Gate::measure(basis)?,
                &member.qubit,
                flip,
                key.clone(),
            )?;
            self.direct.insert(
                member.qubit.clone(),
                DirectMeasurement {
                    basis,
                    reference,
                    round,
                    tick,
                },
            );
            reference
        } else {
            let factors: Vec<(Qubit, Pauli)> = check
                .members()
                .iter()
                .map(|m| (m.qubit.clone(), m.operator.pauli))
                .collect();
            self.circuit
                .add_product_measurement(tick, &factors, flip, key.clone())?
        };
        debug!(check = %check, round, tick, reference = reference.position(), "direct measurement");

        for qubit in &qubits {
            self.grid.occupy(tick, qubit);
            self.touch(qubit, tick);
        }
        self.measurer.on_measurement(&key, &mut self.circuit)
    }

    /// Start-of-round noise on touched data qubits, idling noise on the rest
    fn round_noise(&mut self) {
        let code = self.code;
        let noise = self.noise;
        for qubit in code.data_qubits() {
            if let Some(first) = self.round_first_op.get(qubit).copied() {
                if let Some(spec) = &noise.data_qubit_start_of_round {
                    spec.apply(&mut self.circuit, first, NoisePlacement::Before, &[qubit], Pauli::Z);
                }
                continue;
            }
            let last = self.last_op.get(qubit).copied().unwrap_or(0);
            if !self.grid.is_live(last, qubit) {
                continue;
            }
            let (tick, placement) = if last >= self.layer_start {
                (last, NoisePlacement::After)
            } else {
                (self.layer_start, NoisePlacement::Before)
            };
            for spec in [&noise.idling, &noise.data_qubit_start_of_round].into_iter().flatten() {
                spec.apply(&mut self.circuit, tick, placement, &[qubit], Pauli::Z);
            }
        }
    }

    /// Whether two layers emit the same measurement sequence relative to their first round
    fn same_measurements(&self, first: &Range<usize>, second: &Range<usize>) -> bool {
        let length = self.code.schedule_length() as i64;
        let relative = |range: &Range<usize>, base: i64| -> Vec<(CheckRef, i64)> {
            self.circuit
                .measurement_order(range.clone())
                .into_iter()
                .map(|r| {
                    let key = self.circuit.record().key_of(r);
                    (key.check.clone(), key.round - base)
                })
                .collect()
        };
        relative(first, 0) == relative(second, length)
    }

    /// Final data measurements, final detectors and observable closure
    fn measure_finals(&mut self) -> Result<usize> {
        let code = self.code;
        let last_round = self.rounds - 1;
        let tick = self.barrier();
        let flip = self.noise.measurement_flip();
        let mut finals: BTreeMap<Qubit, (Pauli, MeasurementRef)> = BTreeMap::new();

        for (qubit, basis) in self.request.resolved_final_measurements(code) {
            if let Some(direct) = self.direct.get(&qubit).copied() {
                let untouched = self.last_op.get(&qubit) == Some(&direct.tick);
                if direct.round == last_round && direct.basis == basis && untouched {
                    finals.insert(qubit, (basis, direct.reference));
                    continue;
                }
            }
            let check = Arc::new(Check::from_letters(&[(qubit.clone(), basis)], None)?);
            let key = MeasurementKey::new(check, self.rounds as i64);
            let reference =
                self.circuit
                    .add_measurement(tick, Gate::measure(basis)?, &qubit, flip, key)?;
            self.grid.occupy(tick, &qubit);
            self.grid.set_live(tick, &qubit, false);
            self.touch(&qubit, tick);
            finals.insert(qubit, (basis, reference));
        }

        let placed = self
            .measurer
            .final_detectors(code, last_round, &finals, &mut self.circuit)?;
        self.measurer
            .final_observables(self.rounds, &finals, &mut self.circuit)?;
        Ok(placed)
    }
}
