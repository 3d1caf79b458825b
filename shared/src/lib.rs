use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
pub enum VerdictLabel {
    Real,
    Fake,
}

/// Body of a successful `POST /predict`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub label: VerdictLabel,
    pub confidence: f64,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_scores: Option<BTreeMap<String, f64>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_scores_are_omitted_when_absent() {
        let response = PredictionResponse {
            label: VerdictLabel::Fake,
            confidence: 60.0,
            hash: "ab".repeat(32),
            raw_scores: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["label"], "Fake");
        assert!(json.get("raw_scores").is_none());
    }

    #[test]
    fn verdict_label_parses_from_its_display_form() {
        assert_eq!("Real".parse::<VerdictLabel>().unwrap(), VerdictLabel::Real);
        assert_eq!(VerdictLabel::Fake.to_string(), "Fake");
    }
}
