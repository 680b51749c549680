//! Code fixtures shared by the integration tests

#![allow(dead_code)]

use qec_compiler::extraction::{ExtractionStyle, Orderer, RotatedLatticeOrderer, SyndromeExtractor};
use qec_compiler::{Code, CodeBuilder, Compiler, LogicalOperator, NoiseConfig, Pauli, PauliOperator, Qubit};

/// Repetition code of `distance` data qubits on even coordinates, ZZ checks
/// measured through the ancilla between each neighbouring pair
pub fn repetition(distance: usize) -> Code {
    let data: Vec<Qubit> = (0..distance as i32).map(|i| Qubit::at(&[2 * i])).collect();
    let mut builder = CodeBuilder::new().data_qubits(data.clone());
    let checks = data
        .windows(2)
        .map(|pair| {
            let ancilla = Qubit::at(&[pair[0].coords().values()[0] + 1]);
            builder.check_from_letters(
                &[(pair[0].clone(), Pauli::Z), (pair[1].clone(), Pauli::Z)],
                Some(ancilla),
            )
        })
        .collect::<qec_compiler::Result<Vec<_>>>()
        .unwrap();
    builder
        .round(checks)
        .with_repeated_detectors()
        .unwrap()
        .build()
        .unwrap()
}

/// Single Z logical on the first data qubit of a repetition code
pub fn repetition_logical() -> LogicalOperator {
    LogicalOperator::fixed(vec![(Qubit::at(&[0]), PauliOperator::positive(Pauli::Z))]).unwrap()
}

/// Data qubits of the distance-3 rotated surface code, odd coordinates
pub fn surface_data() -> Vec<Qubit> {
    let mut data = Vec::new();
    for x in [1, 3, 5] {
        for y in [1, 3, 5] {
            data.push(Qubit::at(&[x, y]));
        }
    }
    data
}

/// Distance-3 rotated surface code, X boundaries top and bottom
pub fn rotated_surface() -> Code {
    let data = surface_data();
    let mut builder = CodeBuilder::new().data_qubits(data.clone());
    let mut checks = Vec::new();
    for x in (0..=6).step_by(2) {
        for y in (0..=6).step_by(2) {
            let pauli = if ((x + y) / 2) % 2 == 0 { Pauli::X } else { Pauli::Z };
            let members: Vec<(Qubit, Pauli)> = [(-1, -1), (1, -1), (-1, 1), (1, 1)]
                .iter()
                .map(|(dx, dy)| Qubit::at(&[x + dx, y + dy]))
                .filter(|q| data.contains(q))
                .map(|q| (q, pauli))
                .collect();
            let keep = match members.len() {
                4 => true,
                2 => match pauli {
                    Pauli::X => y == 0 || y == 6,
                    _ => x == 0 || x == 6,
                },
                _ => false,
            };
            if keep {
                checks.push(
                    builder
                        .check_from_letters(&members, Some(Qubit::at(&[x, y])))
                        .unwrap(),
                );
            }
        }
    }
    builder
        .round(checks)
        .with_repeated_detectors()
        .unwrap()
        .build()
        .unwrap()
}

/// Z logical along the bottom row
pub fn surface_z_logical() -> LogicalOperator {
    LogicalOperator::fixed(
        [1, 3, 5]
            .iter()
            .map(|x| (Qubit::at(&[*x, 1]), PauliOperator::positive(Pauli::Z)))
            .collect(),
    )
    .unwrap()
}

pub fn noiseless(style: ExtractionStyle) -> Compiler {
    Compiler::new(
        NoiseConfig::noiseless(),
        SyndromeExtractor::new(style, Orderer::default()),
    )
    .unwrap()
}

pub fn surface_compiler(noise: NoiseConfig) -> Compiler {
    Compiler::new(
        noise,
        SyndromeExtractor::new(
            ExtractionStyle::RotatedCnot,
            Orderer::RotatedLattice(RotatedLatticeOrderer::standard()),
        ),
    )
    .unwrap()
}
