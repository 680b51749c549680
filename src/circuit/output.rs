//! Linearisation of the tick store into a program

use crate::circuit::{grouped_gates, grouped_noise, Annotation, Circuit, GateTarget, Instruction, MeasurementRef, NoiseOp, Target, Tick};
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};

/// Output generation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit a `QUBIT_COORDS` header line per qubit
    pub include_qubit_coords: bool,
    /// Emit a `TICK` after the final tick as well
    pub trailing_tick: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            include_qubit_coords: true,
            trailing_tick: false,
        }
    }
}

/// Walks ticks in order, tracking how many measurements have been emitted
struct Emitter<'a> {
    circuit: &'a Circuit,
    /// Program position of each record entry once emitted
    positions: Vec<Option<i64>>,
    emitted: i64,
}

impl<'a> Emitter<'a> {
    fn new(circuit: &'a Circuit) -> Self {
        Self {
            circuit,
            positions: vec![None; circuit.record().len()],
            emitted: 0,
        }
    }

    fn emit_ticks(&mut self, ticks: &[Tick], out: &mut Vec<Instruction>) -> Result<()> {
        for tick in ticks {
            self.emit_tick(tick, out)?;
            out.push(Instruction::Tick);
        }
        Ok(())
    }

    fn emit_tick(&mut self, tick: &Tick, out: &mut Vec<Instruction>) -> Result<()> {
        emit_noise(&tick.pre_noise, out);

        for ((gate, _), ops) in grouped_gates(&tick.gates) {
            if gate.is_measurement() {
                let mut targets = Vec::with_capacity(ops.len());
                for op in &ops {
                    targets.push(match &op.target {
                        GateTarget::Qubits(qubits) => Target::Qubit(qubits[0]),
                        GateTarget::Product(factors) => Target::Product(factors.clone()),
                    });
                    if let Some(reference) = op.measurement {
                        self.positions[reference.position()] = Some(self.emitted);
                        self.emitted += 1;
                    }
                }
                out.push(Instruction::Measure {
                    gate,
                    flip: ops[0].flip,
                    targets,
                });
            } else {
                let targets = ops
                    .iter()
                    .flat_map(|op| match &op.target {
                        GateTarget::Qubits(qubits) => qubits.to_vec(),
                        GateTarget::Product(factors) => factors.iter().map(|(_, q)| *q).collect(),
                    })
                    .collect();
                out.push(Instruction::Gate { gate, targets });
            }
        }

        emit_noise(&tick.post_noise, out);

        for annotation in &tick.annotations {
            out.push(match annotation {
                Annotation::Detector(measurements) => Instruction::Detector {
                    offsets: self.offsets(measurements)?,
                },
                Annotation::ObservableInclude {
                    index,
                    measurements,
                } => Instruction::ObservableInclude {
                    index: *index,
                    offsets: self.offsets(measurements)?,
                },
            });
        }
        Ok(())
    }

    fn offsets(&self, measurements: &[MeasurementRef]) -> Result<Vec<i64>> {
        measurements
            .iter()
            .map(|reference| {
                self.positions[reference.position()]
                    .map(|position| position - self.emitted)
                    .ok_or_else(|| {
                        QecError::NotYetMeasured(
                            self.circuit.record().key_of(*reference).to_string(),
                        )
                    })
            })
            .collect()
    }
}

fn emit_noise(noise: &[NoiseOp], out: &mut Vec<Instruction>) {
    for (head, targets) in grouped_noise(noise) {
        out.push(Instruction::Noise {
            channel: head.channel,
            parameters: head.parameters.clone(),
            targets,
        });
    }
}

impl Circuit {
    /// Linearise into a program
    ///
    /// Ticks are separated by `TICK`; the repeat region, if any, is wrapped in
    /// a single `REPEAT` block and its contents emitted once.
    pub fn emit(&self, config: &OutputConfig) -> Result<super::Program> {
        let mut instructions = Vec::new();

        if config.include_qubit_coords {
            for (index, qubit) in self.qubits().iter().enumerate() {
                instructions.push(Instruction::QubitCoords {
                    qubit: index,
                    coords: qubit.coords().values().to_vec(),
                });
            }
        }

        let mut emitter = Emitter::new(self);
        let ticks = self.ticks();
        match self.repeat_region() {
            Some(region) => {
                emitter.emit_ticks(&ticks[..region.ticks.start], &mut instructions)?;
                let mut body = Vec::new();
                emitter.emit_ticks(&ticks[region.ticks.clone()], &mut body)?;
                instructions.push(Instruction::Repeat {
                    count: region.repetitions,
                    body,
                });
                emitter.emit_ticks(&ticks[region.ticks.end..], &mut instructions)?;
            }
            None => emitter.emit_ticks(ticks, &mut instructions)?,
        }

        if !config.trailing_tick && matches!(instructions.last(), Some(Instruction::Tick)) {
            instructions.pop();
        }
        Ok(super::Program::new(instructions))
    }
}
