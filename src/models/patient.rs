use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::BloodGroup;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Derived from `date_of_birth` when the row is loaded.
    pub age: u32,
    pub phone: String,
    pub address: String,
    pub sex: String,
    pub email: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrative_data: Option<AdministrativeData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_data: Option<MedicalData>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdministrativeData {
    pub id: i64,
    pub patient_id: i64,
    pub registration_date: NaiveDateTime,
    pub record_number: String,
    pub referring_doctor: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalData {
    pub id: i64,
    pub patient_id: i64,
    pub medical_history: Option<String>,
    pub current_treatments: Option<String>,
    pub mrc_stage: u8,
    pub blood_group: Option<BloodGroup>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Completed years between `date_of_birth` and `today` (0 for future dates).
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    if today < date_of_birth {
        return 0;
    }
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub address: String,
    pub sex: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAdministrativeData {
    pub registration_date: NaiveDateTime,
    pub referring_doctor: String,
    pub record_number: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMedicalData {
    pub medical_history: Option<String>,
    pub current_treatments: Option<String>,
    pub mrc_stage: u8,
    pub blood_group: Option<BloodGroup>,
}

/// Partial update: `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PatientChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub sex: Option<String>,
    pub email: Option<Option<String>>,
    pub administrative: AdministrativeChanges,
    pub medical: MedicalChanges,
}

impl PatientChanges {
    pub fn apply(&self, patient: &mut Patient) {
        if let Some(v) = &self.first_name {
            patient.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            patient.last_name = v.clone();
        }
        if let Some(v) = self.date_of_birth {
            patient.date_of_birth = v;
        }
        if let Some(v) = &self.phone {
            patient.phone = v.clone();
        }
        if let Some(v) = &self.address {
            patient.address = v.clone();
        }
        if let Some(v) = &self.sex {
            patient.sex = v.clone();
        }
        if let Some(v) = &self.email {
            patient.email = v.clone();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdministrativeChanges {
    pub registration_date: Option<NaiveDateTime>,
    pub referring_doctor: Option<String>,
    pub record_number: Option<String>,
    pub emergency_contact_name: Option<Option<String>>,
    pub emergency_contact_phone: Option<Option<String>>,
}

impl AdministrativeChanges {
    pub fn is_empty(&self) -> bool {
        self.registration_date.is_none()
            && self.referring_doctor.is_none()
            && self.record_number.is_none()
            && self.emergency_contact_name.is_none()
            && self.emergency_contact_phone.is_none()
    }

    pub fn apply(&self, data: &mut AdministrativeData) {
        if let Some(v) = self.registration_date {
            data.registration_date = v;
        }
        if let Some(v) = &self.referring_doctor {
            data.referring_doctor = v.clone();
        }
        if let Some(v) = &self.record_number {
            data.record_number = v.clone();
        }
        if let Some(v) = &self.emergency_contact_name {
            data.emergency_contact_name = v.clone();
        }
        if let Some(v) = &self.emergency_contact_phone {
            data.emergency_contact_phone = v.clone();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MedicalChanges {
    pub medical_history: Option<Option<String>>,
    pub current_treatments: Option<Option<String>>,
    pub mrc_stage: Option<u8>,
    pub blood_group: Option<Option<BloodGroup>>,
}

impl MedicalChanges {
    pub fn is_empty(&self) -> bool {
        self.medical_history.is_none()
            && self.current_treatments.is_none()
            && self.mrc_stage.is_none()
            && self.blood_group.is_none()
    }

    pub fn apply(&self, data: &mut MedicalData) {
        if let Some(v) = &self.medical_history {
            data.medical_history = v.clone();
        }
        if let Some(v) = &self.current_treatments {
            data.current_treatments = v.clone();
        }
        if let Some(v) = self.mrc_stage {
            data.mrc_stage = v;
        }
        if let Some(v) = self.blood_group {
            data.blood_group = v;
        }
    }
}
