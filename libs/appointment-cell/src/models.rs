// libs/appointment-cell/src/models.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use doctor_cell::models::DoctorError;
use notification_cell::models::NotificationError;
use patient_cell::models::PatientError;
use shared_models::dates::{normalize_clock, normalize_day, parse_clock};
use shared_models::record::{read_enum, read_f64, read_i64, read_string, Record, RecordError, RecordMap, SymbolicEnum};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub patient_id: String,
    pub patient_name: String,
    /// `YYYY-MM-DD`, or empty when the stored value was not a date.
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub fee: f64,
    pub status: AppointmentStatus,
    pub symptoms: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Appointment {
    pub const COLLECTION: &'static str = "appointments";

    pub fn path(id: &str) -> String {
        format!("{}/{}", Self::COLLECTION, id)
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    pub fn can_be_completed(&self) -> bool {
        self.status.can_be_completed()
    }

    /// Key used to order listings: date, then start time.
    pub fn schedule_key(&self) -> (String, u32) {
        (self.date.clone(), parse_clock(&self.start_time).into_inner())
    }

    pub fn involves(&self, uid: &str) -> bool {
        self.doctor_id == uid || self.patient_id == uid
    }
}

impl Record for Appointment {
    fn key(&self) -> &str {
        &self.id
    }

    fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("id".into(), json!(self.id));
        map.insert("doctorId".into(), json!(self.doctor_id));
        map.insert("doctorName".into(), json!(self.doctor_name));
        map.insert("patientId".into(), json!(self.patient_id));
        map.insert("patientName".into(), json!(self.patient_name));
        map.insert("date".into(), json!(self.date));
        map.insert("startTime".into(), json!(self.start_time));
        map.insert("endTime".into(), json!(self.end_time));
        map.insert("fee".into(), json!(self.fee));
        map.insert("status".into(), json!(self.status.name()));
        map.insert("symptoms".into(), json!(self.symptoms));
        map.insert("createdAt".into(), json!(self.created_at));
        map.insert("updatedAt".into(), json!(self.updated_at));
        map
    }

    fn from_map(map: &RecordMap) -> Result<Self, RecordError> {
        Ok(Self {
            id: read_string(map, "id").into_inner(),
            doctor_id: read_string(map, "doctorId").into_inner(),
            doctor_name: read_string(map, "doctorName").into_inner(),
            patient_id: read_string(map, "patientId").into_inner(),
            patient_name: read_string(map, "patientName").into_inner(),
            date: normalize_day(&read_string(map, "date").into_inner()).into_inner(),
            start_time: normalize_clock(&read_string(map, "startTime").into_inner()).into_inner(),
            end_time: normalize_clock(&read_string(map, "endTime").into_inner()).into_inner(),
            fee: read_f64(map, "fee").into_inner(),
            status: read_enum(map, "status").into_inner(),
            symptoms: read_string(map, "symptoms").into_inner(),
            created_at: read_i64(map, "createdAt").into_inner(),
            updated_at: read_i64(map, "updatedAt").into_inner(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn can_be_cancelled(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn can_be_completed(&self) -> bool {
        matches!(self, AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl SymbolicEnum for AppointmentStatus {
    const KIND: &'static str = "appointment status";
    const VARIANTS: &'static [Self] = &[
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    fn name(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for AppointmentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    /// Defaults to the caller.
    pub patient_id: Option<String>,
    pub date: String,
    pub slot_id: String,
    #[serde(default)]
    pub symptoms: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<String>,
}

// ==============================================================================
// ERROR MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot already booked: {0}")]
    SlotAlreadyBooked(String),

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::SlotNotFound => AppointmentError::SlotNotFound,
            DoctorError::SlotAlreadyBooked(id) => AppointmentError::SlotAlreadyBooked(id),
            DoctorError::InvalidDate(msg)
            | DoctorError::DayHasBookings(msg)
            | DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

impl From<PatientError> for AppointmentError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppointmentError::PatientNotFound,
            PatientError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            PatientError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

impl From<NotificationError> for AppointmentError {
    fn from(err: NotificationError) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Appointment {
        Appointment {
            id: "apt-1".to_string(),
            doctor_id: "doc-1".to_string(),
            doctor_name: "Dr. Zoe".to_string(),
            patient_id: "pat-1".to_string(),
            patient_name: "Grace".to_string(),
            date: "2030-05-20".to_string(),
            start_time: "09:00".to_string(),
            end_time: "09:30".to_string(),
            fee: 50.0,
            status: AppointmentStatus::Confirmed,
            symptoms: "Headache".to_string(),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_100_000,
        }
    }

    #[test]
    fn status_capabilities() {
        assert!(AppointmentStatus::Pending.can_be_cancelled());
        assert!(!AppointmentStatus::Pending.can_be_completed());
        assert!(AppointmentStatus::Confirmed.can_be_cancelled());
        assert!(AppointmentStatus::Confirmed.can_be_completed());
        assert!(!AppointmentStatus::Cancelled.can_be_cancelled());
        assert!(!AppointmentStatus::Cancelled.can_be_completed());
        assert!(!AppointmentStatus::Completed.can_be_cancelled());
        assert!(!AppointmentStatus::Completed.can_be_completed());
    }

    #[test]
    fn round_trips_through_map() {
        let appointment = sample();
        assert_eq!(Appointment::from_map(&appointment.to_map()).unwrap(), appointment);
        assert_eq!(Appointment::from_map(&RecordMap::new()).unwrap(), Appointment::default());
    }

    #[test]
    fn status_is_stored_uppercase() {
        assert_eq!(sample().to_map()["status"], json!("CONFIRMED"));
    }

    #[test]
    fn lenient_fields_fall_back() {
        let mut map = sample().to_map();
        map.insert("status".into(), json!("RESCHEDULED"));
        map.insert("date".into(), json!("20/05/2030"));
        map.insert("fee".into(), json!("free"));
        map.insert("startTime".into(), json!("9am"));

        let appointment = Appointment::from_map(&map).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.date, "");
        assert_eq!(appointment.fee, 0.0);
        assert_eq!(appointment.start_time, "");
    }

    #[test]
    fn schedule_key_orders_by_date_then_time() {
        let mut early = sample();
        early.start_time = "08:30".to_string();
        let mut next_day = sample();
        next_day.date = "2030-05-21".to_string();
        next_day.start_time = "07:00".to_string();

        let mut list = vec![next_day.clone(), sample(), early.clone()];
        list.sort_by_key(Appointment::schedule_key);
        assert_eq!(list, vec![early, sample(), next_day]);
    }
}
