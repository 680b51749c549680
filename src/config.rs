//! JSON job descriptions consumed by the command-line tool

use crate::code::Code;
use crate::compiler::{CompileOutput, CompileRequest, Compiler, CompilerConfig};
use crate::extraction::SyndromeExtractor;
use crate::noise::NoiseConfig;
use crate::{QecError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Noise given either as a named preset or spelled out per location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoiseSource {
    Preset { preset: String, probability: f64 },
    Explicit(NoiseConfig),
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::Explicit(NoiseConfig::noiseless())
    }
}

impl NoiseSource {
    pub fn resolve(&self) -> Result<NoiseConfig> {
        match self {
            Self::Preset {
                preset,
                probability,
            } => NoiseConfig::preset(preset, *probability),
            Self::Explicit(config) => Ok(config.clone()),
        }
    }
}

/// Everything needed for one compilation
///
/// ```json
/// {
///   "code": { "data_qubits": [[0], [2]], "check_schedule": [...], ... },
///   "request": { "layers": 5 },
///   "noise": { "preset": "standard_depolarizing", "probability": 0.001 },
///   "extractor": { "style": "pure_cnot" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileJob {
    pub code: Code,
    pub request: CompileRequest,
    #[serde(default)]
    pub noise: NoiseSource,
    #[serde(default)]
    pub extractor: SyndromeExtractor,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

impl CompileJob {
    pub fn new(code: Code, request: CompileRequest) -> Self {
        Self {
            code,
            request,
            noise: NoiseSource::default(),
            extractor: SyndromeExtractor::default(),
            compiler: CompilerConfig::default(),
        }
    }

    /// Load a job from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check noise and request without compiling
    pub fn validate(&self) -> Result<()> {
        self.noise.resolve()?.validate()?;
        self.request.validate(&self.code).map_err(|e| match e {
            QecError::InvalidRequest(message) => QecError::config(format!("request: {}", message)),
            other => other,
        })
    }

    pub fn compiler(&self) -> Result<Compiler> {
        Ok(
            Compiler::new(self.noise.resolve()?, self.extractor.clone())?
                .with_config(self.compiler.clone()),
        )
    }

    pub fn run(&self) -> Result<CompileOutput> {
        self.compiler()?.compile(&self.code, &self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{CodeBuilder, Pauli, Qubit};
    use crate::extraction::ExtractionStyle;

    fn job() -> CompileJob {
        let mut builder = CodeBuilder::new().data_qubits([Qubit::at(&[0]), Qubit::at(&[2])]);
        let zz = builder
            .check_from_letters(
                &[(Qubit::at(&[0]), Pauli::Z), (Qubit::at(&[2]), Pauli::Z)],
                Some(Qubit::at(&[1])),
            )
            .unwrap();
        let code = builder
            .round(vec![zz])
            .with_repeated_detectors()
            .unwrap()
            .build()
            .unwrap();
        CompileJob::new(code, CompileRequest::new(2))
    }

    #[test]
    fn test_job_json_round_trip() {
        let mut original = job();
        original.extractor.style = ExtractionStyle::PureCnot;
        original.noise = NoiseSource::Preset {
            preset: "phenomenological".into(),
            probability: 0.01,
        };
        let back = CompileJob::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(back.extractor, original.extractor);
        assert_eq!(back.noise, original.noise);
        assert_eq!(back.request, original.request);
    }

    #[test]
    fn test_explicit_noise_parses() {
        let json = r#"{ "measurement": { "name": "flip", "probability": 0.01 } }"#;
        let source: NoiseSource = serde_json::from_str(json).unwrap();
        let noise = source.resolve().unwrap();
        assert_eq!(noise.measurement_flip(), Some(0.01));
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let mut job = job();
        job.noise = NoiseSource::Preset {
            preset: "cosmic_rays".into(),
            probability: 0.1,
        };
        assert!(matches!(job.validate(), Err(QecError::Config(_))));
    }

    #[test]
    fn test_invalid_request_reported_as_config() {
        let mut job = job();
        job.request.layers = 0;
        assert!(matches!(job.validate(), Err(QecError::Config(_))));
    }

    #[test]
    fn test_run_compiles() {
        let output = job().run().unwrap();
        assert_eq!(output.report.compiled_rounds, 2);
        assert!(output.program.to_stim().contains("DETECTOR"));
    }
}
