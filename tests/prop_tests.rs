//! Property-based tests for compiled schedules and Pauli algebra

mod common;

use common::*;
use proptest::prelude::*;
use qec_compiler::circuit::{GateTarget, Instruction};
use qec_compiler::code::PauliProduct;
use qec_compiler::extraction::ExtractionStyle;
use qec_compiler::*;
use std::collections::HashSet;

fn style() -> impl Strategy<Value = ExtractionStyle> {
    prop_oneof![
        Just(ExtractionStyle::ControlledPauli),
        Just(ExtractionStyle::PureCnot),
        Just(ExtractionStyle::RotatedCnot),
    ]
}

fn pauli() -> impl Strategy<Value = Pauli> {
    prop_oneof![Just(Pauli::I), Just(Pauli::X), Just(Pauli::Y), Just(Pauli::Z)]
}

fn product(letters: &[Pauli]) -> PauliProduct {
    let operators: Vec<(Qubit, PauliOperator)> = letters
        .iter()
        .enumerate()
        .filter(|(_, p)| **p != Pauli::I)
        .map(|(i, p)| (Qubit::at(&[i as i32]), PauliOperator::positive(*p)))
        .collect();
    PauliProduct::from_operators(operators.iter().map(|(q, o)| (q, o)))
}

fn max_offset_magnitude(instructions: &[Instruction], emitted: &mut i64) -> std::result::Result<(), String> {
    for instruction in instructions {
        match instruction {
            Instruction::Measure { targets, .. } => *emitted += targets.len() as i64,
            Instruction::Detector { offsets } | Instruction::ObservableInclude { offsets, .. } => {
                for offset in offsets {
                    if *offset >= 0 || -offset > *emitted {
                        return Err(format!("offset {} with {} measurements", offset, emitted));
                    }
                }
            }
            Instruction::Repeat { count, body } => {
                for _ in 0..*count {
                    max_offset_magnitude(body, emitted)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every compiled repetition code closes one detector per check per
    /// round plus one per check at the end.
    #[test]
    fn prop_repetition_detectors(distance in 2usize..7, layers in 1usize..9, style in style()) {
        let code = repetition(distance);
        let output = noiseless(style).compile(&code, &CompileRequest::new(layers)).unwrap();
        prop_assert_eq!(output.program.detector_count(), (distance - 1) * (layers + 1));
        prop_assert_eq!(
            output.program.measurement_count(),
            (distance - 1) * layers + distance
        );
    }

    /// No tick touches a qubit twice and every record offset points backwards.
    #[test]
    fn prop_schedule_well_formed(distance in 2usize..6, layers in 1usize..6, style in style(), p in 0.0f64..0.1) {
        let code = repetition(distance);
        let compiler = Compiler::new(
            NoiseConfig::standard_depolarizing(p),
            extraction::SyndromeExtractor::new(style, Default::default()),
        )
        .unwrap();
        let output = compiler
            .compile(&code, &CompileRequest::new(layers).with_observable(repetition_logical()))
            .unwrap();

        for tick in output.circuit.ticks() {
            let mut seen = HashSet::new();
            for op in &tick.gates {
                let qubits: Vec<usize> = match &op.target {
                    GateTarget::Qubits(qubits) => qubits.to_vec(),
                    GateTarget::Product(factors) => factors.iter().map(|(_, q)| *q).collect(),
                };
                for q in qubits {
                    prop_assert!(seen.insert(q));
                }
            }
        }

        let mut emitted = 0;
        prop_assert!(max_offset_magnitude(&output.program.instructions, &mut emitted).is_ok());
    }

    /// Compiling twice gives the same text.
    #[test]
    fn prop_deterministic(layers in 1usize..6, p in 0.0f64..0.05) {
        let code = rotated_surface();
        let compiler = surface_compiler(NoiseConfig::phenomenological(p));
        let request = CompileRequest::new(layers).with_observable(surface_z_logical());
        prop_assert_eq!(
            compiler.compile_to_stim(&code, &request).unwrap(),
            compiler.compile_to_stim(&code, &request).unwrap()
        );
    }

    /// Multiplying a Pauli product in twice restores the original letters.
    #[test]
    fn prop_double_multiplication_cancels(
        a in prop::collection::vec(pauli(), 1..8),
        b in prop::collection::vec(pauli(), 1..8),
    ) {
        let original = product(&a);
        let other = product(&b);
        let mut toggled = original.clone();
        toggled.multiply(&other);
        toggled.multiply(&other);
        prop_assert!(toggled.same_letters(&original));
    }
}
