use rusqlite::Connection;

use super::appointment::count_appointments;
use super::consultation::count_consultations;
use super::patient::count_patients;
use super::user::count_users_by_role;
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::DashboardStats;

/// Counters shown on the admin home page. Doctors are accounts with the
/// `user` role.
pub fn dashboard_stats(conn: &Connection) -> Result<DashboardStats, DatabaseError> {
    Ok(DashboardStats {
        doctors: count_users_by_role(conn, Role::User)?,
        patients: count_patients(conn)?,
        appointments: count_appointments(conn)?,
        consultations: count_consultations(conn)?,
    })
}
