//! Noise configuration and its translation into noise channels

use crate::circuit::{Circuit, NoiseChannel, NoisePlacement};
use crate::code::{Pauli, Qubit};
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Channel names accepted in a noise configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelName {
    #[serde(rename = "depolarize1")]
    Depolarize1,
    #[serde(rename = "depolarize2")]
    Depolarize2,
    #[serde(rename = "x_error")]
    XError,
    #[serde(rename = "y_error")]
    YError,
    #[serde(rename = "z_error")]
    ZError,
    /// Basis-aware flip: the error that flips a reset or measurement outcome
    #[serde(rename = "flip")]
    Flip,
    #[serde(rename = "pauli_channel_1")]
    PauliChannel1,
    #[serde(rename = "pauli_channel_2")]
    PauliChannel2,
}

impl ChannelName {
    /// Qubits per application
    pub fn arity(&self) -> usize {
        match self {
            ChannelName::Depolarize2 | ChannelName::PauliChannel2 => 2,
            _ => 1,
        }
    }

    /// Number of explicit terms required, if the channel is term-based
    fn term_count(&self) -> Option<usize> {
        match self {
            ChannelName::PauliChannel1 => Some(3),
            ChannelName::PauliChannel2 => Some(15),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelName::Depolarize1 => "depolarize1",
            ChannelName::Depolarize2 => "depolarize2",
            ChannelName::XError => "x_error",
            ChannelName::YError => "y_error",
            ChannelName::ZError => "z_error",
            ChannelName::Flip => "flip",
            ChannelName::PauliChannel1 => "pauli_channel_1",
            ChannelName::PauliChannel2 => "pauli_channel_2",
        };
        write!(f, "{}", name)
    }
}

/// One configured noise channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: ChannelName,
    pub probability: f64,
    /// Per-Pauli weights for `pauli_channel_1` (3) and `pauli_channel_2` (15)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<Vec<f64>>,
}

impl ChannelSpec {
    pub fn new(name: ChannelName, probability: f64) -> Self {
        Self {
            name,
            probability,
            terms: None,
        }
    }

    pub fn with_terms(mut self, terms: Vec<f64>) -> Self {
        self.terms = Some(terms);
        self
    }

    pub fn arity(&self) -> usize {
        self.name.arity()
    }

    fn validate(&self, option: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(QecError::config(format!(
                "{}: probability {} outside [0, 1]",
                option, self.probability
            )));
        }
        match (self.name.term_count(), &self.terms) {
            (Some(expected), Some(terms)) => {
                if terms.len() != expected {
                    return Err(QecError::config(format!(
                        "{}: {} takes {} terms, got {}",
                        option,
                        self.name,
                        expected,
                        terms.len()
                    )));
                }
                if terms.iter().any(|t| !(0.0..=1.0).contains(t)) || terms.iter().sum::<f64>() > 1.0 {
                    return Err(QecError::config(format!(
                        "{}: {} terms must be in [0, 1] and sum to at most 1",
                        option, self.name
                    )));
                }
            }
            (Some(expected), None) => {
                return Err(QecError::config(format!(
                    "{}: {} needs {} terms",
                    option, self.name, expected
                )));
            }
            (None, Some(_)) => {
                return Err(QecError::config(format!(
                    "{}: {} does not take terms",
                    option, self.name
                )));
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Concrete channel and parameters; `basis` resolves `flip`
    pub fn resolve(&self, basis: Pauli) -> (NoiseChannel, SmallVec<[f64; 3]>) {
        let p = self.probability;
        let terms = || -> SmallVec<[f64; 3]> { self.terms.iter().flatten().copied().collect() };
        match self.name {
            ChannelName::Depolarize1 => (NoiseChannel::Depolarize1, smallvec::smallvec![p]),
            ChannelName::Depolarize2 => (NoiseChannel::Depolarize2, smallvec::smallvec![p]),
            ChannelName::XError => (NoiseChannel::XError, smallvec::smallvec![p]),
            ChannelName::YError => (NoiseChannel::YError, smallvec::smallvec![p]),
            ChannelName::ZError => (NoiseChannel::ZError, smallvec::smallvec![p]),
            ChannelName::Flip => (NoiseChannel::flip_for(basis), smallvec::smallvec![p]),
            ChannelName::PauliChannel1 => (NoiseChannel::PauliChannel1, terms()),
            ChannelName::PauliChannel2 => (NoiseChannel::PauliChannel2, terms()),
        }
    }

    /// Add this channel to `targets`; two-qubit channels take targets in pairs
    pub(crate) fn apply(
        &self,
        circuit: &mut Circuit,
        tick: usize,
        placement: NoisePlacement,
        targets: &[&Qubit],
        basis: Pauli,
    ) {
        if self.probability == 0.0 && self.terms.is_none() {
            return;
        }
        let (channel, parameters) = self.resolve(basis);
        circuit.add_noise(tick, placement, channel, &parameters, targets);
    }
}

/// Noise model applied while compiling
///
/// Every option is optional; an absent option adds no noise at that location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// After every reset
    pub initialisation: Option<ChannelSpec>,
    /// Once per round on data qubits the round does not touch
    pub idling: Option<ChannelSpec>,
    /// Before each data qubit's first operation in a round
    pub data_qubit_start_of_round: Option<ChannelSpec>,
    /// After every single-qubit unitary
    pub one_qubit_gate: Option<ChannelSpec>,
    /// After every two-qubit gate
    pub two_qubit_gate: Option<ChannelSpec>,
    /// Classical flip of measurement outcomes; must be `flip`
    pub measurement: Option<ChannelSpec>,
}

impl NoiseConfig {
    /// No noise at all
    pub fn noiseless() -> Self {
        Self::default()
    }

    /// Data-qubit depolarisation once per round plus measurement flips
    pub fn phenomenological(p: f64) -> Self {
        Self {
            data_qubit_start_of_round: Some(ChannelSpec::new(ChannelName::Depolarize1, p)),
            measurement: Some(ChannelSpec::new(ChannelName::Flip, p)),
            ..Self::default()
        }
    }

    /// Uniform circuit-level depolarising noise
    pub fn standard_depolarizing(p: f64) -> Self {
        Self {
            initialisation: Some(ChannelSpec::new(ChannelName::Flip, p)),
            idling: Some(ChannelSpec::new(ChannelName::Depolarize1, p)),
            data_qubit_start_of_round: None,
            one_qubit_gate: Some(ChannelSpec::new(ChannelName::Depolarize1, p)),
            two_qubit_gate: Some(ChannelSpec::new(ChannelName::Depolarize2, p)),
            measurement: Some(ChannelSpec::new(ChannelName::Flip, p)),
        }
    }

    /// Look up a preset by name, as used by job files and the CLI
    pub fn preset(name: &str, p: f64) -> Result<Self> {
        match name {
            "noiseless" => Ok(Self::noiseless()),
            "phenomenological" => Ok(Self::phenomenological(p)),
            "standard_depolarizing" => Ok(Self::standard_depolarizing(p)),
            other => Err(QecError::config(format!("unknown noise preset: {}", other))),
        }
    }

    pub fn is_noiseless(&self) -> bool {
        self.options().iter().all(|(_, spec)| spec.is_none())
    }

    fn options(&self) -> [(&'static str, &Option<ChannelSpec>); 6] {
        [
            ("initialisation", &self.initialisation),
            ("idling", &self.idling),
            ("data_qubit_start_of_round", &self.data_qubit_start_of_round),
            ("one_qubit_gate", &self.one_qubit_gate),
            ("two_qubit_gate", &self.two_qubit_gate),
            ("measurement", &self.measurement),
        ]
    }

    /// Validate channel names, probabilities and placement
    pub fn validate(&self) -> Result<()> {
        for (option, spec) in self.options() {
            let Some(spec) = spec else { continue };
            spec.validate(option)?;
            if spec.arity() == 2 && option != "two_qubit_gate" {
                return Err(QecError::config(format!(
                    "{}: two-qubit channel {} only allowed on two_qubit_gate",
                    option, spec.name
                )));
            }
        }
        if let Some(spec) = &self.measurement {
            if spec.name != ChannelName::Flip {
                return Err(QecError::config(format!(
                    "measurement: channel must be flip, got {}",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Flip probability attached to measurements
    pub fn measurement_flip(&self) -> Option<f64> {
        self.measurement
            .as_ref()
            .map(|spec| spec.probability)
            .filter(|p| *p > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(NoiseConfig::noiseless().validate().is_ok());
        assert!(NoiseConfig::noiseless().is_noiseless());
        assert!(NoiseConfig::phenomenological(0.01).validate().is_ok());
        assert!(NoiseConfig::standard_depolarizing(1e-3).validate().is_ok());
        assert!(NoiseConfig::preset("unknown", 0.1).is_err());
    }

    #[test]
    fn test_probability_range() {
        let config = NoiseConfig {
            idling: Some(ChannelSpec::new(ChannelName::Depolarize1, 1.5)),
            ..NoiseConfig::default()
        };
        assert!(matches!(config.validate(), Err(QecError::Config(_))));
    }

    #[test]
    fn test_two_qubit_channel_placement() {
        let config = NoiseConfig {
            one_qubit_gate: Some(ChannelSpec::new(ChannelName::Depolarize2, 0.1)),
            ..NoiseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_measurement_must_flip() {
        let config = NoiseConfig {
            measurement: Some(ChannelSpec::new(ChannelName::XError, 0.1)),
            ..NoiseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pauli_channel_terms() {
        let good = ChannelSpec::new(ChannelName::PauliChannel1, 0.0).with_terms(vec![0.1, 0.0, 0.1]);
        assert!(good.validate("one_qubit_gate").is_ok());
        let (channel, parameters) = good.resolve(Pauli::Z);
        assert_eq!(channel, NoiseChannel::PauliChannel1);
        assert_eq!(parameters.len(), 3);

        let missing = ChannelSpec::new(ChannelName::PauliChannel1, 0.1);
        assert!(missing.validate("one_qubit_gate").is_err());
    }

    #[test]
    fn test_json_names() {
        let config: NoiseConfig = serde_json::from_str(
            r#"{"two_qubit_gate": {"name": "depolarize2", "probability": 0.001},
                "measurement": {"name": "flip", "probability": 0.002}}"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.measurement_flip(), Some(0.002));
        assert!(serde_json::from_str::<NoiseConfig>(r#"{"idling": {"name": "bogus", "probability": 0.1}}"#).is_err());
    }

    #[test]
    fn test_flip_resolves_by_basis() {
        let flip = ChannelSpec::new(ChannelName::Flip, 0.1);
        assert_eq!(flip.resolve(Pauli::Z).0, NoiseChannel::XError);
        assert_eq!(flip.resolve(Pauli::X).0, NoiseChannel::ZError);
    }
}
