use std::collections::BTreeMap;

use realcheck_shared::VerdictLabel;
use strum_macros::{Display, EnumString};

use super::InferenceError;

/// Native class labels produced by the supported model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ClassLabel {
    Fake,
    Real,
    Artificial,
    Deepfake,
}

/// How a model's native label set collapses into a Real/Fake decision.
/// Chosen once when the model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LabelPolicy {
    /// Labels `[Fake, Real]`; the argmax is the verdict.
    Binary,
    /// Labels `[Artificial, Deepfake, Real]`; Deepfake and Real both count as real.
    Ternary,
}

impl LabelPolicy {
    pub fn labels(&self) -> &'static [ClassLabel] {
        match self {
            LabelPolicy::Binary => &[ClassLabel::Fake, ClassLabel::Real],
            LabelPolicy::Ternary => &[ClassLabel::Artificial, ClassLabel::Deepfake, ClassLabel::Real],
        }
    }

    pub fn aggregate(&self, probabilities: &ClassProbabilities) -> Decision {
        match self {
            LabelPolicy::Binary => {
                // First maximum wins, so an exact tie resolves to Fake.
                let (label, score) = probabilities.iter().fold(
                    (ClassLabel::Fake, f64::NEG_INFINITY),
                    |best, (label, score)| if score > best.1 { (label, score) } else { best },
                );
                let label = match label {
                    ClassLabel::Real => VerdictLabel::Real,
                    _ => VerdictLabel::Fake,
                };
                Decision::new(label, score)
            }
            LabelPolicy::Ternary => {
                let fake_score = probabilities.get(ClassLabel::Artificial);
                let real_score =
                    probabilities.get(ClassLabel::Deepfake) + probabilities.get(ClassLabel::Real);
                if real_score >= fake_score {
                    Decision::new(VerdictLabel::Real, real_score)
                } else {
                    Decision::new(VerdictLabel::Fake, fake_score)
                }
            }
        }
    }
}

/// Probability per native label, in the model's output order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities {
    scores: Vec<(ClassLabel, f64)>,
}

impl ClassProbabilities {
    pub fn from_output(policy: LabelPolicy, output: &[f64]) -> Result<Self, InferenceError> {
        let labels = policy.labels();
        if output.len() != labels.len() {
            return Err(InferenceError::LabelMismatch {
                expected: labels.len(),
                actual: output.len(),
            });
        }
        let scores = labels
            .iter()
            .copied()
            .zip(output.iter().copied())
            .collect();
        Ok(Self { scores })
    }

    pub fn get(&self, label: ClassLabel) -> f64 {
        self.scores
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassLabel, f64)> + '_ {
        self.scores.iter().copied()
    }

    /// Per-class scores as percentages rounded to 4 decimals.
    pub fn percentages(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|(label, p)| (label.to_string(), round_to(p * 100.0, 4)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub label: VerdictLabel,
    /// Percentage in `[0, 100]`, rounded to 2 decimals.
    pub confidence: f64,
}

impl Decision {
    fn new(label: VerdictLabel, score: f64) -> Self {
        Self {
            label,
            confidence: round_to(score * 100.0, 2),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
