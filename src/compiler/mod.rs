//! Schedule compiler: turns a code and a request into a tick-scheduled program
//!
//! [`Compiler::compile`] is a pure function of its inputs. Every piece of
//! mutable state (tick grid, circuit store, resolver) lives in a
//! [`session::Session`] created for the call and dropped afterwards, so a
//! compiler can be shared freely and recompiling gives identical output.

pub mod occupancy;
mod session;

pub use occupancy::*;

use crate::circuit::{Circuit, OutputConfig, Program};
use crate::code::{Code, LogicalOperator, Pauli, Qubit, State};
use crate::extraction::SyndromeExtractor;
use crate::measurer::ScheduleEntry;
use crate::noise::NoiseConfig;
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Emit the middle layers as one `REPEAT` block when possible
    pub repeat_middle_layers: bool,
    /// Program rendering options
    pub output: OutputConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            repeat_middle_layers: true,
            output: OutputConfig::default(),
        }
    }
}

/// What to compile: how many layers, and how the experiment starts and ends
///
/// One layer is one full period of the code's check schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub layers: usize,
    /// Data qubits not listed start in |0>
    #[serde(default, with = "entries")]
    pub initial_states: BTreeMap<Qubit, State>,
    /// When empty every data qubit is measured in the basis it was prepared in
    #[serde(default)]
    pub final_measurements: Vec<(Qubit, Pauli)>,
    #[serde(default)]
    pub logical_observables: Vec<LogicalOperator>,
}

impl CompileRequest {
    pub fn new(layers: usize) -> Self {
        Self {
            layers,
            initial_states: BTreeMap::new(),
            final_measurements: Vec::new(),
            logical_observables: Vec::new(),
        }
    }

    /// Set the initial state of one data qubit
    pub fn with_initial_state(mut self, qubit: Qubit, state: State) -> Self {
        self.initial_states.insert(qubit, state);
        self
    }

    /// Prepare every data qubit of `code` in `state`
    pub fn with_uniform_state(mut self, code: &Code, state: State) -> Self {
        for qubit in code.data_qubits() {
            self.initial_states.insert(qubit.clone(), state);
        }
        self
    }

    /// Measure one data qubit in `basis` at the end
    pub fn with_final_measurement(mut self, qubit: Qubit, basis: Pauli) -> Self {
        self.final_measurements.push((qubit, basis));
        self
    }

    /// Track a logical observable; its index is its position in the request
    pub fn with_observable(mut self, logical: LogicalOperator) -> Self {
        self.logical_observables.push(logical);
        self
    }

    /// Check the request against `code`
    pub fn validate(&self, code: &Code) -> Result<()> {
        if self.layers == 0 {
            return Err(QecError::invalid_request("at least one layer is required"));
        }
        if let Some(qubit) = self.initial_states.keys().find(|q| !code.is_data_qubit(q)) {
            return Err(QecError::invalid_request(format!(
                "initial state given for {} which is not a data qubit",
                qubit
            )));
        }
        let mut measured = HashSet::new();
        for (qubit, basis) in &self.final_measurements {
            if !code.is_data_qubit(qubit) {
                return Err(QecError::invalid_request(format!(
                    "final measurement of {} which is not a data qubit",
                    qubit
                )));
            }
            if *basis == Pauli::I {
                return Err(QecError::invalid_request(format!(
                    "final measurement of {} in the identity basis",
                    qubit
                )));
            }
            if !measured.insert(qubit) {
                return Err(QecError::invalid_request(format!(
                    "{} measured twice at the end",
                    qubit
                )));
            }
        }
        for logical in &self.logical_observables {
            code.validate_logical(logical)?;
        }
        Ok(())
    }

    /// Final measurements with the default filled in
    pub(crate) fn resolved_final_measurements(&self, code: &Code) -> Vec<(Qubit, Pauli)> {
        if !self.final_measurements.is_empty() {
            return self.final_measurements.clone();
        }
        code.data_qubits()
            .map(|q| {
                let state = self.initial_states.get(q).copied().unwrap_or_default();
                (q.clone(), state.basis())
            })
            .collect()
    }
}

/// Serde adapter storing a qubit-keyed map as a list of pairs
mod entries {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// Summary of one compilation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileReport {
    /// Layers requested
    pub layers: usize,
    /// Rounds actually compiled (a repeated middle layer is compiled once)
    pub compiled_rounds: usize,
    /// Ticks in the compiled store
    pub ticks: usize,
    /// Measurements in the compiled store
    pub measurements: usize,
    /// Resolved detectors per schedule entry, `(round, index) -> count`
    pub detectors: Vec<(ScheduleEntry, usize)>,
    /// Detectors closing on the final data measurements
    pub final_detectors: usize,
    /// Boundary detectors dropped because the initial state does not fix them
    pub discarded_detectors: usize,
    /// Whether the middle layers were emitted as a `REPEAT` block
    pub repeated: bool,
}

impl CompileReport {
    /// Total detectors placed in the compiled store
    pub fn total_detectors(&self) -> usize {
        self.detectors.iter().map(|(_, n)| n).sum::<usize>() + self.final_detectors
    }
}

/// Compiled artefacts
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub circuit: Circuit,
    pub program: Program,
    pub report: CompileReport,
}

/// Schedule compiler
#[derive(Debug, Clone)]
pub struct Compiler {
    noise: NoiseConfig,
    extractor: SyndromeExtractor,
    config: CompilerConfig,
}

impl Compiler {
    /// Create a compiler; the noise configuration is validated here
    pub fn new(noise: NoiseConfig, extractor: SyndromeExtractor) -> Result<Self> {
        noise.validate()?;
        Ok(Self {
            noise,
            extractor,
            config: CompilerConfig::default(),
        })
    }

    /// Replace the compiler configuration
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn noise(&self) -> &NoiseConfig {
        &self.noise
    }

    pub fn extractor(&self) -> &SyndromeExtractor {
        &self.extractor
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `request` against `code`
    pub fn compile(&self, code: &Code, request: &CompileRequest) -> Result<CompileOutput> {
        request.validate(code)?;
        info!(
            layers = request.layers,
            schedule_length = code.schedule_length(),
            data_qubits = code.data_qubit_count(),
            "compiling schedule"
        );

        let session = session::Session::new(self, code, request);
        let (circuit, report) = session.run()?;
        let program = circuit.emit(&self.config.output)?;

        info!(
            ticks = report.ticks,
            measurements = report.measurements,
            detectors = report.total_detectors(),
            repeated = report.repeated,
            "compilation finished"
        );
        Ok(CompileOutput {
            circuit,
            program,
            report,
        })
    }

    /// Compile and render as Stim text
    pub fn compile_to_stim(&self, code: &Code, request: &CompileRequest) -> Result<String> {
        Ok(self.compile(code, request)?.program.to_stim())
    }
}
