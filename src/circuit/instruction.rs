//! Gate, noise and instruction definitions for emitted programs

use crate::code::Pauli;
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Gates the compiler emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    /// Reset to |0>
    R,
    /// Reset to |+>
    RX,
    /// Pauli-X
    X,
    /// Hadamard
    H,
    /// Hadamard-like swap of the Y and Z axes
    HYZ,
    /// Maps |0> to |-> up to phase; used to prepare |->
    SqrtYDag,
    /// Maps |0> to |-i>
    SqrtX,
    /// Maps |0> to |+i>
    SqrtXDag,
    /// Controlled-X
    CX,
    /// Controlled-Y
    CY,
    /// Controlled-Z
    CZ,
    /// Z-basis measurement
    M,
    /// X-basis measurement
    MX,
    /// Y-basis measurement
    MY,
    /// Pauli-product measurement
    MPP,
}

impl Gate {
    /// Instruction name in program text
    pub fn name(&self) -> &'static str {
        match self {
            Gate::R => "R",
            Gate::RX => "RX",
            Gate::X => "X",
            Gate::H => "H",
            Gate::HYZ => "H_YZ",
            Gate::SqrtYDag => "SQRT_Y_DAG",
            Gate::SqrtX => "SQRT_X",
            Gate::SqrtXDag => "SQRT_X_DAG",
            Gate::CX => "CX",
            Gate::CY => "CY",
            Gate::CZ => "CZ",
            Gate::M => "M",
            Gate::MX => "MX",
            Gate::MY => "MY",
            Gate::MPP => "MPP",
        }
    }

    /// Look up a gate by its instruction name
    pub fn from_name(name: &str) -> Option<Self> {
        let gate = match name {
            "R" => Gate::R,
            "RX" => Gate::RX,
            "X" => Gate::X,
            "H" => Gate::H,
            "H_YZ" => Gate::HYZ,
            "SQRT_Y_DAG" => Gate::SqrtYDag,
            "SQRT_X" => Gate::SqrtX,
            "SQRT_X_DAG" => Gate::SqrtXDag,
            "CX" | "CNOT" => Gate::CX,
            "CY" => Gate::CY,
            "CZ" => Gate::CZ,
            "M" | "MZ" => Gate::M,
            "MX" => Gate::MX,
            "MY" => Gate::MY,
            "MPP" => Gate::MPP,
            _ => return None,
        };
        Some(gate)
    }

    /// Number of qubits one application acts on; `MPP` is variable and reports 0
    pub fn arity(&self) -> usize {
        match self {
            Gate::CX | Gate::CY | Gate::CZ => 2,
            Gate::MPP => 0,
            _ => 1,
        }
    }

    pub fn is_measurement(&self) -> bool {
        matches!(self, Gate::M | Gate::MX | Gate::MY | Gate::MPP)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Gate::R | Gate::RX)
    }

    /// Controlled-`pauli` gate, control first
    pub fn controlled(pauli: Pauli) -> Result<Self> {
        match pauli {
            Pauli::X => Ok(Gate::CX),
            Pauli::Y => Ok(Gate::CY),
            Pauli::Z => Ok(Gate::CZ),
            Pauli::I => Err(QecError::extraction("no controlled-identity gate")),
        }
    }

    /// Single-qubit measurement in the basis of `pauli`
    pub fn measure(pauli: Pauli) -> Result<Self> {
        match pauli {
            Pauli::X => Ok(Gate::MX),
            Pauli::Y => Ok(Gate::MY),
            Pauli::Z => Ok(Gate::M),
            Pauli::I => Err(QecError::invalid_request("cannot measure in the identity basis")),
        }
    }

    /// Basis letter of a single-qubit measurement or reset
    pub fn basis(&self) -> Option<Pauli> {
        match self {
            Gate::R | Gate::M => Some(Pauli::Z),
            Gate::RX | Gate::MX => Some(Pauli::X),
            Gate::MY => Some(Pauli::Y),
            _ => None,
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Stochastic Pauli channels available in programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseChannel {
    XError,
    YError,
    ZError,
    Depolarize1,
    Depolarize2,
    PauliChannel1,
    PauliChannel2,
}

impl NoiseChannel {
    pub fn name(&self) -> &'static str {
        match self {
            NoiseChannel::XError => "X_ERROR",
            NoiseChannel::YError => "Y_ERROR",
            NoiseChannel::ZError => "Z_ERROR",
            NoiseChannel::Depolarize1 => "DEPOLARIZE1",
            NoiseChannel::Depolarize2 => "DEPOLARIZE2",
            NoiseChannel::PauliChannel1 => "PAULI_CHANNEL_1",
            NoiseChannel::PauliChannel2 => "PAULI_CHANNEL_2",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let channel = match name {
            "X_ERROR" => NoiseChannel::XError,
            "Y_ERROR" => NoiseChannel::YError,
            "Z_ERROR" => NoiseChannel::ZError,
            "DEPOLARIZE1" => NoiseChannel::Depolarize1,
            "DEPOLARIZE2" => NoiseChannel::Depolarize2,
            "PAULI_CHANNEL_1" => NoiseChannel::PauliChannel1,
            "PAULI_CHANNEL_2" => NoiseChannel::PauliChannel2,
            _ => return None,
        };
        Some(channel)
    }

    /// Qubits per application
    pub fn arity(&self) -> usize {
        match self {
            NoiseChannel::Depolarize2 | NoiseChannel::PauliChannel2 => 2,
            _ => 1,
        }
    }

    /// Number of parameters the channel takes
    pub fn parameter_count(&self) -> usize {
        match self {
            NoiseChannel::PauliChannel1 => 3,
            NoiseChannel::PauliChannel2 => 15,
            _ => 1,
        }
    }

    /// Channel flipping a state prepared or measured in `basis`
    pub fn flip_for(basis: Pauli) -> Self {
        match basis {
            Pauli::X => NoiseChannel::ZError,
            _ => NoiseChannel::XError,
        }
    }
}

/// Measurement target: a qubit index or a Pauli product over qubit indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Qubit(usize),
    Product(SmallVec<[(Pauli, usize); 4]>),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Qubit(q) => write!(f, "{}", q),
            Target::Product(factors) => {
                for (i, (pauli, q)) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    write!(f, "{}{}", pauli, q)?;
                }
                Ok(())
            }
        }
    }
}

/// One line (or block) of an emitted program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Coordinates attached to a qubit index
    QubitCoords { qubit: usize, coords: Vec<i32> },
    /// Unitary or reset gate
    Gate { gate: Gate, targets: Vec<usize> },
    /// Noise channel
    Noise {
        channel: NoiseChannel,
        parameters: SmallVec<[f64; 3]>,
        targets: Vec<usize>,
    },
    /// Measurement, optionally with a classical flip probability
    Measure {
        gate: Gate,
        flip: Option<f64>,
        targets: Vec<Target>,
    },
    /// Parity of earlier measurements, as negative record offsets
    Detector { offsets: Vec<i64> },
    /// Measurements folded into a logical observable
    ObservableInclude { index: usize, offsets: Vec<i64> },
    Tick,
    Repeat {
        count: usize,
        body: Vec<Instruction>,
    },
}

impl Instruction {
    /// Render the instruction as program text at the given indentation
    pub fn write_stim(&self, out: &mut String, indent: usize) {
        let pad = "    ".repeat(indent);
        match self {
            Instruction::QubitCoords { qubit, coords } => {
                let coords: Vec<String> = coords.iter().map(|c| c.to_string()).collect();
                out.push_str(&format!("{}QUBIT_COORDS({}) {}\n", pad, coords.join(", "), qubit));
            }
            Instruction::Gate { gate, targets } => {
                out.push_str(&format!("{}{}{}\n", pad, gate, join_targets(targets)));
            }
            Instruction::Noise {
                channel,
                parameters,
                targets,
            } => {
                let parameters: Vec<String> = parameters.iter().map(|p| p.to_string()).collect();
                out.push_str(&format!(
                    "{}{}({}){}\n",
                    pad,
                    channel.name(),
                    parameters.join(", "),
                    join_targets(targets)
                ));
            }
            Instruction::Measure {
                gate,
                flip,
                targets,
            } => {
                out.push_str(&pad);
                out.push_str(gate.name());
                if let Some(p) = flip {
                    out.push_str(&format!("({})", p));
                }
                out.push_str(&join_targets(targets));
                out.push('\n');
            }
            Instruction::Detector { offsets } => {
                out.push_str(&format!("{}DETECTOR{}\n", pad, join_records(offsets)));
            }
            Instruction::ObservableInclude { index, offsets } => {
                out.push_str(&format!(
                    "{}OBSERVABLE_INCLUDE({}){}\n",
                    pad,
                    index,
                    join_records(offsets)
                ));
            }
            Instruction::Tick => {
                out.push_str(&pad);
                out.push_str("TICK\n");
            }
            Instruction::Repeat { count, body } => {
                out.push_str(&format!("{}REPEAT {} {{\n", pad, count));
                for instruction in body {
                    instruction.write_stim(out, indent + 1);
                }
                out.push_str(&pad);
                out.push_str("}\n");
            }
        }
    }
}

fn join_targets<T: fmt::Display>(targets: &[T]) -> String {
    targets.iter().map(|t| format!(" {}", t)).collect()
}

fn join_records(offsets: &[i64]) -> String {
    offsets.iter().map(|o| format!(" rec[{}]", o)).collect()
}

/// A linear instruction list, renderable as Stim text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Parse a program from Stim text
    pub fn from_stim(text: &str) -> Result<Self> {
        super::parser::parse_stim(text)
    }

    /// Render as Stim text
    pub fn to_stim(&self) -> String {
        let mut out = String::new();
        for instruction in &self.instructions {
            instruction.write_stim(&mut out, 0);
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Measurements executed, with repeat blocks expanded
    pub fn measurement_count(&self) -> usize {
        count(&self.instructions, &|i| match i {
            Instruction::Measure { targets, .. } => targets.len(),
            _ => 0,
        })
    }

    /// Detectors declared, with repeat blocks expanded
    pub fn detector_count(&self) -> usize {
        count(&self.instructions, &|i| matches!(i, Instruction::Detector { .. }) as usize)
    }

    /// Ticks executed, with repeat blocks expanded
    pub fn tick_count(&self) -> usize {
        count(&self.instructions, &|i| matches!(i, Instruction::Tick) as usize)
    }

    /// Highest observable index plus one
    pub fn observable_count(&self) -> usize {
        fn walk(instructions: &[Instruction]) -> usize {
            instructions
                .iter()
                .map(|i| match i {
                    Instruction::ObservableInclude { index, .. } => index + 1,
                    Instruction::Repeat { body, .. } => walk(body),
                    _ => 0,
                })
                .max()
                .unwrap_or(0)
        }
        walk(&self.instructions)
    }
}

fn count(instructions: &[Instruction], weigh: &dyn Fn(&Instruction) -> usize) -> usize {
    instructions
        .iter()
        .map(|i| match i {
            Instruction::Repeat { count: n, body } => n * count(body, weigh),
            other => weigh(other),
        })
        .sum()
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_stim())
    }
}
