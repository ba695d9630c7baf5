//! Structured result of one extraction pass: entities grounded to ontology
//! terms and the relationships between them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// A confidence lies outside `[0, 1]`.
    #[error("entity `{entity}` has {field} {value}, expected a value between 0 and 1")]
    Confidence {
        entity: String,
        field: &'static str,
        value: f64,
    },
    /// A relationship names an entity that was not extracted.
    #[error("relationship `{subject} {predicate} {object}` refers to unknown entity `{missing}`")]
    DanglingRelationship {
        subject: String,
        predicate: String,
        object: String,
        missing: String,
    },
    #[error("extraction result is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Label,
    Synonym,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Mention as it appears in the source text.
    pub text: String,
    pub entity_type: String,
    #[serde(default)]
    pub ontology_id: Option<String>,
    #[serde(default)]
    pub ontology_label: Option<String>,
    #[serde(default)]
    pub is_grounded: bool,
    #[serde(default)]
    pub match_type: Option<MatchType>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub grounding_confidence: Option<f64>,
    /// e.g. `ontology:mondo` or `web_search`.
    #[serde(default)]
    pub grounding_source: Option<String>,
    #[serde(default)]
    pub curator_note: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

fn full_confidence() -> f64 {
    1.0
}

impl Entity {
    #[must_use]
    pub fn new(text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_type: entity_type.into(),
            ontology_id: None,
            ontology_label: None,
            is_grounded: false,
            match_type: None,
            confidence: 1.0,
            grounding_confidence: None,
            grounding_source: None,
            curator_note: None,
            properties: BTreeMap::new(),
        }
    }

    /// Marks the entity as grounded to an ontology term.
    #[must_use]
    pub fn grounded(
        mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        source: impl Into<String>,
        match_type: MatchType,
    ) -> Self {
        self.ontology_id = Some(id.into());
        self.ontology_label = Some(label.into());
        self.grounding_source = Some(source.into());
        self.match_type = Some(match_type);
        self.is_grounded = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// Sentence supporting the relationship.
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            relationships: Vec::new(),
            schema_name: None,
            timestamp: Utc::now(),
        }
    }
}

impl ExtractionResult {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or on the first invalid field.
    pub fn from_json(json: &str) -> Result<Self, ExtractionError> {
        let result: Self = serde_json::from_str(json)?;
        result.validate()?;
        Ok(result)
    }

    /// # Errors
    ///
    /// Fails when serialisation fails.
    pub fn to_json(&self) -> Result<String, ExtractionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks confidence bounds and that relationships connect extracted
    /// entities.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        for entity in &self.entities {
            let confidences = [
                ("confidence", Some(entity.confidence)),
                ("grounding_confidence", entity.grounding_confidence),
            ];
            for (field, value) in confidences {
                if let Some(value) = value.filter(|value| !(0.0..=1.0).contains(value)) {
                    return Err(ExtractionError::Confidence {
                        entity: entity.text.clone(),
                        field,
                        value,
                    });
                }
            }
        }
        for relationship in &self.relationships {
            for end in [&relationship.subject, &relationship.object] {
                if !self.entities.iter().any(|entity| entity.text == *end) {
                    return Err(ExtractionError::DanglingRelationship {
                        subject: relationship.subject.clone(),
                        predicate: relationship.predicate.clone(),
                        object: relationship.object.clone(),
                        missing: end.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_documents_with_defaults() {
        let result = ExtractionResult::from_json(
            r#"{"entities":[{"text":"BRCA1","entity_type":"gene"}]}"#,
        )
        .expect("valid");
        let entity = &result.entities[0];
        assert!((entity.confidence - 1.0).abs() < f64::EPSILON);
        assert!(!entity.is_grounded);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let err = ExtractionResult::from_json(
            r#"{"entities":[{"text":"BRCA1","entity_type":"gene","grounding_confidence":1.5}]}"#,
        )
        .expect_err("out of range");
        assert_eq!(
            err.to_string(),
            "entity `BRCA1` has grounding_confidence 1.5, expected a value between 0 and 1"
        );
    }

    #[test]
    fn rejects_relationships_to_unknown_entities() {
        let result = ExtractionResult {
            entities: vec![Entity::new("BRCA1", "gene")],
            relationships: vec![Relationship {
                subject: "BRCA1".to_string(),
                predicate: "associated_with".to_string(),
                object: "breast cancer".to_string(),
                text: "BRCA1 is associated with breast cancer.".to_string(),
            }],
            ..ExtractionResult::default()
        };
        assert!(matches!(
            result.validate(),
            Err(ExtractionError::DanglingRelationship { ref missing, .. }) if missing == "breast cancer"
        ));
    }

    #[test]
    fn serialises_grounding() {
        let result = ExtractionResult {
            entities: vec![Entity::new("breast cancer", "disease").grounded(
                "MONDO:0007254",
                "breast cancer",
                "ontology:mondo",
                MatchType::Label,
            )],
            schema_name: Some("genes".to_string()),
            ..ExtractionResult::default()
        };
        let json: serde_json::Value =
            serde_json::from_str(&result.to_json().expect("json")).expect("value");
        assert_eq!(json["entities"][0]["match_type"], "label");
        assert_eq!(json["entities"][0]["ontology_id"], "MONDO:0007254");
        assert_eq!(json["schema_name"], "genes");
    }
}
