use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::appointment::Appointment;
use super::enums::ConsultationStatus;
use super::patient::Patient;
use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub consultation_date: NaiveDateTime,
    pub doctor_remarks: String,
    pub cost: f64,
    pub status: ConsultationStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
}

#[derive(Debug, Clone)]
pub struct NewConsultation {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub consultation_date: NaiveDateTime,
    pub doctor_remarks: String,
    pub cost: f64,
    pub status: ConsultationStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ConsultationChanges {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub appointment_id: Option<Option<i64>>,
    pub consultation_date: Option<NaiveDateTime>,
    pub doctor_remarks: Option<String>,
    pub cost: Option<f64>,
    pub status: Option<ConsultationStatus>,
}

impl ConsultationChanges {
    pub fn apply(&self, consultation: &mut Consultation) {
        if let Some(v) = self.patient_id {
            consultation.patient_id = v;
        }
        if let Some(v) = self.doctor_id {
            consultation.doctor_id = v;
        }
        if let Some(v) = self.appointment_id {
            consultation.appointment_id = v;
        }
        if let Some(v) = self.consultation_date {
            consultation.consultation_date = v;
        }
        if let Some(v) = &self.doctor_remarks {
            consultation.doctor_remarks = v.clone();
        }
        if let Some(v) = self.cost {
            consultation.cost = v;
        }
        if let Some(v) = self.status {
            consultation.status = v;
        }
    }
}
