use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Care protocol for a chronic kidney disease (MRC) stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrcProtocol {
    pub id: i64,
    pub name: String,
    pub stage: u8,
    pub recommendations: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolAssignment {
    #[serde(flatten)]
    pub protocol: MrcProtocol,
    pub assigned_by: Option<i64>,
    pub assigned_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProtocol {
    pub name: String,
    pub stage: u8,
    pub recommendations: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct ProtocolChanges {
    pub name: Option<String>,
    pub stage: Option<u8>,
    pub recommendations: Option<serde_json::Value>,
}

impl ProtocolChanges {
    pub fn apply(&self, protocol: &mut MrcProtocol) {
        if let Some(v) = &self.name {
            protocol.name = v.clone();
        }
        if let Some(v) = self.stage {
            protocol.stage = v;
        }
        if let Some(v) = &self.recommendations {
            protocol.recommendations = v.clone();
        }
    }
}
