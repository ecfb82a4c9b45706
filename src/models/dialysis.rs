use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::DialysisType;

/// One dialysis session. `parameters` holds free-form measurements such as
/// `{"weight_before": 70, "weight_after": 68, "uf_volume": 2}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialysisStep {
    pub id: i64,
    pub patient_id: i64,
    #[serde(rename = "type")]
    pub step_type: DialysisType,
    pub start_time: NaiveDateTime,
    pub duration_minutes: u32,
    pub parameters: serde_json::Value,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDialysisStep {
    pub step_type: DialysisType,
    pub start_time: NaiveDateTime,
    pub duration_minutes: u32,
    pub parameters: serde_json::Value,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DialysisStepChanges {
    pub step_type: Option<DialysisType>,
    pub start_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<u32>,
    pub parameters: Option<serde_json::Value>,
    pub notes: Option<Option<String>>,
}

impl DialysisStepChanges {
    pub fn apply(&self, step: &mut DialysisStep) {
        if let Some(v) = self.step_type {
            step.step_type = v;
        }
        if let Some(v) = self.start_time {
            step.start_time = v;
        }
        if let Some(v) = self.duration_minutes {
            step.duration_minutes = v;
        }
        if let Some(v) = &self.parameters {
            step.parameters = v.clone();
        }
        if let Some(v) = &self.notes {
            step.notes = v.clone();
        }
    }
}
