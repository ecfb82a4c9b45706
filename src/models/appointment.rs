use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{AppointmentStatus, TaskStatus};
use super::patient::Patient;
use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDateTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<AssignedTask>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentTask {
    pub id: i64,
    #[serde(rename = "type")]
    pub task_type: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A task attached to an appointment, with the user it was assigned by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedTask {
    #[serde(flatten)]
    pub task: AppointmentTask,
    pub user_id: i64,
    pub assigned_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDateTime,
    pub notes: Option<String>,
    pub task_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentChanges {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub date: Option<NaiveDateTime>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<Option<String>>,
    /// Replaces the attached task set when present.
    pub task_ids: Option<Vec<i64>>,
}

impl AppointmentChanges {
    pub fn apply(&self, appointment: &mut Appointment) {
        if let Some(v) = self.patient_id {
            appointment.patient_id = v;
        }
        if let Some(v) = self.doctor_id {
            appointment.doctor_id = v;
        }
        if let Some(v) = self.date {
            appointment.date = v;
        }
        if let Some(v) = self.status {
            appointment.status = v;
        }
        if let Some(v) = &self.notes {
            appointment.notes = v.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_type: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}
