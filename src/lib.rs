//! # QEC Schedule Compiler
//!
//! Compiles a periodic schedule of stabilizer checks into a tick-scheduled
//! Stim circuit with noise, detectors and logical observables.
//!
//! A [`Code`] lists data qubits, which checks are measured in each round of
//! its period, which detectors compare outcomes across rounds, and how logical
//! operators move through the schedule. A [`Compiler`] turns a code and a
//! [`CompileRequest`] (layer count, initial states, final measurements,
//! observables) into a [`Program`]. Middle layers are emitted once inside a
//! `REPEAT` block when their measurement pattern matches the first layer.
//!
//! ```
//! use qec_compiler::{CodeBuilder, CompileRequest, Compiler, NoiseConfig, Pauli, Qubit};
//! use qec_compiler::extraction::{ExtractionStyle, Orderer, SyndromeExtractor};
//!
//! let mut builder = CodeBuilder::new().data_qubits([Qubit::at(&[0]), Qubit::at(&[2])]);
//! let zz = builder
//!     .check_from_letters(
//!         &[(Qubit::at(&[0]), Pauli::Z), (Qubit::at(&[2]), Pauli::Z)],
//!         Some(Qubit::at(&[1])),
//!     )
//!     .unwrap();
//! let code = builder.round(vec![zz]).with_repeated_detectors().unwrap().build().unwrap();
//!
//! let compiler = Compiler::new(
//!     NoiseConfig::noiseless(),
//!     SyndromeExtractor::new(ExtractionStyle::PureCnot, Orderer::default()),
//! )
//! .unwrap();
//! let stim = compiler.compile_to_stim(&code, &CompileRequest::new(3)).unwrap();
//! assert!(stim.contains("REPEAT 1 {"));
//! ```

// Core modules
pub mod circuit;
pub mod code;
pub mod compiler;
pub mod error;
pub mod extraction;
pub mod measurer;
pub mod noise;

// Job files and command line
pub mod api;
pub mod config;

// Re-exports for convenience
pub use circuit::{Circuit, Instruction, OutputConfig, Program};
pub use code::{
    Check, CheckRef, Code, CodeBuilder, Detector, LogicalOperator, Pauli, PauliOperator, Qubit,
    State,
};
pub use compiler::{CompileOutput, CompileReport, CompileRequest, Compiler, CompilerConfig};
pub use config::CompileJob;
pub use error::{QecError, Result};
pub use noise::{ChannelName, ChannelSpec, NoiseConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
