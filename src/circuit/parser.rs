//! Stim text parser implementation
//!
//! Covers the subset of the format the compiler emits, so programs can be
//! read back for inspection and round-tripped through the CLI.

use crate::circuit::{Gate, Instruction, NoiseChannel, Program, Target};
use crate::code::Pauli;
use crate::{QecError, Result};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, line_ending, not_line_ending, one_of, space0, space1},
    combinator::{eof, map, map_res, opt, recognize},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use smallvec::SmallVec;

/// Parse a complete program
pub fn parse_stim(input: &str) -> Result<Program> {
    match parse_block(input) {
        Ok((remaining, instructions)) => {
            if !remaining.trim().is_empty() {
                return Err(QecError::parse(
                    format!("Unexpected content: {}", first_line(remaining)),
                    input.len() - remaining.len(),
                ));
            }
            Ok(Program::new(instructions))
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(QecError::parse(
            format!("Cannot parse {:?} ({:?})", first_line(e.input), e.code),
            input.len() - e.input.len(),
        )),
        Err(nom::Err::Incomplete(_)) => Err(QecError::parse("Incomplete input", input.len())),
    }
}

fn first_line(input: &str) -> &str {
    input.trim_start().lines().next().unwrap_or("")
}

/// Raw instruction target before it is checked against the instruction kind
#[derive(Debug, Clone, PartialEq)]
enum RawTarget {
    Record(i64),
    Product(SmallVec<[(Pauli, usize); 4]>),
    Qubit(usize),
}

/// Parse instructions until end of input or a closing brace
fn parse_block(mut input: &str) -> IResult<&str, Vec<Instruction>> {
    let mut instructions = Vec::new();
    loop {
        let (rest, _) = many0(blank_line)(input)?;
        let (rest, _) = space0(rest)?;
        if rest.is_empty() || rest.starts_with('}') {
            return Ok((rest, instructions));
        }
        let (rest, instruction) = alt((parse_repeat, parse_instruction))(rest)?;
        let (rest, _) = line_end(rest)?;
        instructions.push(instruction);
        input = rest;
    }
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char('#'), not_line_ending)(input)
}

fn blank_line(input: &str) -> IResult<&str, ()> {
    map(tuple((space0, opt(comment), line_ending)), |_| ())(input)
}

fn line_end(input: &str) -> IResult<&str, ()> {
    map(tuple((space0, opt(comment), alt((line_ending, eof)))), |_| ())(input)
}

fn parse_integer(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, many0(alt((alphanumeric1, tag("_"))))))(input)
}

/// `(a, b, c)`
fn parse_arguments(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(
        pair(char('('), space0),
        separated_list0(tuple((space0, char(','), space0)), double),
        pair(space0, char(')')),
    )(input)
}

fn parse_record(input: &str) -> IResult<&str, i64> {
    delimited(
        tag("rec["),
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| s.parse::<i64>()),
        char(']'),
    )(input)
}

fn parse_pauli_factor(input: &str) -> IResult<&str, (Pauli, usize)> {
    let (input, letter) = one_of("XYZ")(input)?;
    let (input, qubit) = parse_integer(input)?;
    let pauli = match letter {
        'X' => Pauli::X,
        'Y' => Pauli::Y,
        _ => Pauli::Z,
    };
    Ok((input, (pauli, qubit)))
}

fn parse_target(input: &str) -> IResult<&str, RawTarget> {
    alt((
        map(parse_record, RawTarget::Record),
        map(separated_list1(char('*'), parse_pauli_factor), |factors| {
            RawTarget::Product(factors.into_iter().collect())
        }),
        map(parse_integer, RawTarget::Qubit),
    ))(input)
}

/// `REPEAT n { ... }`
fn parse_repeat(input: &str) -> IResult<&str, Instruction> {
    let (input, _) = terminated(tag("REPEAT"), space1)(input)?;
    let (input, count) = parse_integer(input)?;
    let (input, _) = tuple((space0, char('{')))(input)?;
    let (input, _) = line_end(input)?;
    let (input, body) = parse_block(input)?;
    let (input, _) = char('}')(input)?;
    Ok((input, Instruction::Repeat { count, body }))
}

/// `NAME(args) targets`
fn parse_instruction(input: &str) -> IResult<&str, Instruction> {
    let start = input;
    let (input, name) = parse_identifier(input)?;
    let (input, arguments) = opt(parse_arguments)(input)?;
    let (input, targets) = many0(preceded(space1, parse_target))(input)?;
    let arguments = arguments.unwrap_or_default();

    let reject = || nom::Err::Failure(Error::new(start, ErrorKind::Verify));

    let instruction = match name {
        "TICK" if targets.is_empty() => Instruction::Tick,
        "DETECTOR" => Instruction::Detector {
            offsets: records(&targets).ok_or_else(reject)?,
        },
        "OBSERVABLE_INCLUDE" => Instruction::ObservableInclude {
            index: match arguments.as_slice() {
                [index] if *index >= 0.0 => *index as usize,
                _ => return Err(reject()),
            },
            offsets: records(&targets).ok_or_else(reject)?,
        },
        "QUBIT_COORDS" => match targets.as_slice() {
            [RawTarget::Qubit(qubit)] => Instruction::QubitCoords {
                qubit: *qubit,
                coords: arguments.iter().map(|c| *c as i32).collect(),
            },
            _ => return Err(reject()),
        },
        _ => {
            if let Some(gate) = Gate::from_name(name) {
                if gate.is_measurement() {
                    Instruction::Measure {
                        gate,
                        flip: arguments.first().copied(),
                        targets: measure_targets(gate, &targets).ok_or_else(reject)?,
                    }
                } else {
                    Instruction::Gate {
                        gate,
                        targets: qubits(&targets).ok_or_else(reject)?,
                    }
                }
            } else if let Some(channel) = NoiseChannel::from_name(name) {
                if arguments.len() != channel.parameter_count() {
                    return Err(reject());
                }
                Instruction::Noise {
                    channel,
                    parameters: arguments.into_iter().collect(),
                    targets: qubits(&targets).ok_or_else(reject)?,
                }
            } else {
                return Err(reject());
            }
        }
    };
    Ok((input, instruction))
}

fn records(targets: &[RawTarget]) -> Option<Vec<i64>> {
    targets
        .iter()
        .map(|t| match t {
            RawTarget::Record(offset) if *offset < 0 => Some(*offset),
            _ => None,
        })
        .collect()
}

fn qubits(targets: &[RawTarget]) -> Option<Vec<usize>> {
    targets
        .iter()
        .map(|t| match t {
            RawTarget::Qubit(q) => Some(*q),
            _ => None,
        })
        .collect()
}

fn measure_targets(gate: Gate, targets: &[RawTarget]) -> Option<Vec<Target>> {
    targets
        .iter()
        .map(|t| match (gate, t) {
            (Gate::MPP, RawTarget::Product(factors)) => Some(Target::Product(factors.clone())),
            (Gate::MPP, _) => None,
            (_, RawTarget::Qubit(q)) => Some(Target::Qubit(*q)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_program_parsing() {
        let text = "R 0 1 2\nTICK\nCX 0 2\nTICK\nM 2\nDETECTOR rec[-1]\n";
        let program = parse_stim(text).unwrap();
        assert_eq!(program.instructions.len(), 6);
        assert_eq!(
            program.instructions[2],
            Instruction::Gate {
                gate: Gate::CX,
                targets: vec![0, 2]
            }
        );
        assert_eq!(program.to_stim(), text);
    }

    #[test]
    fn test_repeat_and_comments() {
        let text = r#"
            # memory experiment
            R 0
            REPEAT 3 {
                M(0.01) 0  # noisy
                DETECTOR rec[-1]
                TICK
            }
            OBSERVABLE_INCLUDE(0) rec[-1]
        "#;
        let program = parse_stim(text).unwrap();
        assert_eq!(program.instructions.len(), 3);
        match &program.instructions[1] {
            Instruction::Repeat { count, body } => {
                assert_eq!(*count, 3);
                assert_eq!(body.len(), 3);
            }
            other => panic!("Expected repeat block, got {:?}", other),
        }
        assert_eq!(program.measurement_count(), 3);
    }

    #[test]
    fn test_product_measurement_and_noise() {
        let program = parse_stim("MPP X0*Z1 Y2\nPAULI_CHANNEL_1(0.1, 0.2, 0.3) 4\n").unwrap();
        match &program.instructions[0] {
            Instruction::Measure { gate, targets, .. } => {
                assert_eq!(*gate, Gate::MPP);
                assert_eq!(targets.len(), 2);
            }
            other => panic!("Expected measurement, got {:?}", other),
        }
        match &program.instructions[1] {
            Instruction::Noise { parameters, .. } => assert_eq!(parameters.len(), 3),
            other => panic!("Expected noise, got {:?}", other),
        }
    }

    #[test]
    fn test_qubit_coords() {
        let program = parse_stim("QUBIT_COORDS(1, -2) 7\n").unwrap();
        assert_eq!(
            program.instructions[0],
            Instruction::QubitCoords {
                qubit: 7,
                coords: vec![1, -2]
            }
        );
    }

    #[test]
    fn test_malformed_program() {
        assert!(parse_stim("FOO 1\n").is_err());
        assert!(parse_stim("DETECTOR rec[1]\n").is_err());
        assert!(parse_stim("DEPOLARIZE1 0\n").is_err());
        let err = parse_stim("R 0\nREPEAT 2 {\nTICK\n").unwrap_err();
        assert!(matches!(err, QecError::Parse { .. }));
    }
}
