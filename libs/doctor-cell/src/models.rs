use serde::{Deserialize, Serialize};
use serde_json::json;

use shared_models::dates::{format_clock, normalize_clock, parse_clock};
use shared_models::record::{
    optional_value, read_bool, read_f64, read_i64, read_optional_string, read_string, Record,
    RecordError, RecordMap,
};

// ==============================================================================
// DOCTOR PROFILE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub qualification: String,
    pub experience_years: i64,
    pub consultation_fee: f64,
    pub about: String,
    pub profile_image_url: String,
    pub rating: f64,
    pub is_available: bool,
    pub created_at: i64,
}

impl Doctor {
    pub const COLLECTION: &'static str = "doctors";

    pub fn path(uid: &str) -> String {
        format!("{}/{}", Self::COLLECTION, uid)
    }

    pub fn display_name(&self) -> String {
        if self.name.starts_with("Dr.") {
            self.name.clone()
        } else {
            format!("Dr. {}", self.name)
        }
    }
}

impl Record for Doctor {
    fn key(&self) -> &str {
        &self.uid
    }

    fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("uid".into(), json!(self.uid));
        map.insert("name".into(), json!(self.name));
        map.insert("email".into(), json!(self.email));
        map.insert("phone".into(), json!(self.phone));
        map.insert("specialization".into(), json!(self.specialization));
        map.insert("qualification".into(), json!(self.qualification));
        map.insert("experienceYears".into(), json!(self.experience_years));
        map.insert("consultationFee".into(), json!(self.consultation_fee));
        map.insert("about".into(), json!(self.about));
        map.insert("profileImageUrl".into(), json!(self.profile_image_url));
        map.insert("rating".into(), json!(self.rating));
        map.insert("isAvailable".into(), json!(self.is_available));
        map.insert("createdAt".into(), json!(self.created_at));
        map
    }

    fn from_map(map: &RecordMap) -> Result<Self, RecordError> {
        Ok(Self {
            uid: read_string(map, "uid").into_inner(),
            name: read_string(map, "name").into_inner(),
            email: read_string(map, "email").into_inner(),
            phone: read_string(map, "phone").into_inner(),
            specialization: read_string(map, "specialization").into_inner(),
            qualification: read_string(map, "qualification").into_inner(),
            experience_years: read_i64(map, "experienceYears").into_inner(),
            consultation_fee: read_f64(map, "consultationFee").into_inner(),
            about: read_string(map, "about").into_inner(),
            profile_image_url: read_string(map, "profileImageUrl").into_inner(),
            rating: read_f64(map, "rating").into_inner(),
            is_available: read_bool(map, "isAvailable").into_inner(),
            created_at: read_i64(map, "createdAt").into_inner(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
    pub consultation_fee: Option<f64>,
    pub about: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_available: Option<bool>,
}

impl UpdateDoctorRequest {
    /// Storage keys touched by this update.
    pub fn to_patch(&self) -> RecordMap {
        let mut patch = RecordMap::new();
        if let Some(name) = &self.name {
            patch.insert("name".into(), json!(name));
        }
        if let Some(phone) = &self.phone {
            patch.insert("phone".into(), json!(phone));
        }
        if let Some(specialization) = &self.specialization {
            patch.insert("specialization".into(), json!(specialization));
        }
        if let Some(qualification) = &self.qualification {
            patch.insert("qualification".into(), json!(qualification));
        }
        if let Some(years) = self.experience_years {
            patch.insert("experienceYears".into(), json!(years));
        }
        if let Some(fee) = self.consultation_fee {
            patch.insert("consultationFee".into(), json!(fee));
        }
        if let Some(about) = &self.about {
            patch.insert("about".into(), json!(about));
        }
        if let Some(url) = &self.profile_image_url {
            patch.insert("profileImageUrl".into(), json!(url));
        }
        if let Some(available) = self.is_available {
            patch.insert("isAvailable".into(), json!(available));
        }
        patch
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorListQuery {
    pub available_only: Option<bool>,
    pub specialization: Option<String>,
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// A bookable window on one doctor's day.
///
/// `appointment_id` is `Some` exactly when `is_booked` is true; use
/// [`Slot::book`] and [`Slot::release`] rather than setting the fields apart.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    pub is_booked: bool,
    pub appointment_id: Option<String>,
}

impl Slot {
    pub fn new(number: u32, start_minutes: u32, end_minutes: u32) -> Self {
        Self {
            id: format!("slot_{}", number),
            start_time: format_clock(start_minutes),
            end_time: format_clock(end_minutes),
            is_booked: false,
            appointment_id: None,
        }
    }

    pub fn path(doctor_id: &str, date: &str, slot_id: &str) -> String {
        format!("{}/{}", Self::day_path(doctor_id, date), slot_id)
    }

    pub fn day_path(doctor_id: &str, date: &str) -> String {
        format!("slots/{}/{}", doctor_id, date)
    }

    pub fn start_minutes(&self) -> u32 {
        parse_clock(&self.start_time).into_inner()
    }

    pub fn duration_minutes(&self) -> u32 {
        parse_clock(&self.end_time)
            .into_inner()
            .saturating_sub(self.start_minutes())
    }

    pub fn is_available(&self) -> bool {
        !self.is_booked
    }

    /// Claims the slot. Returns false if it was already booked.
    pub fn book(&mut self, appointment_id: &str) -> bool {
        if self.is_booked {
            return false;
        }
        self.is_booked = true;
        self.appointment_id = Some(appointment_id.to_string());
        true
    }

    pub fn release(&mut self) {
        self.is_booked = false;
        self.appointment_id = None;
    }
}

impl Record for Slot {
    fn key(&self) -> &str {
        &self.id
    }

    fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("id".into(), json!(self.id));
        map.insert("startTime".into(), json!(self.start_time));
        map.insert("endTime".into(), json!(self.end_time));
        map.insert("isBooked".into(), json!(self.is_booked));
        map.insert("appointmentId".into(), optional_value(&self.appointment_id));
        map
    }

    fn from_map(map: &RecordMap) -> Result<Self, RecordError> {
        let flagged = read_bool(map, "isBooked").into_inner();
        let appointment_id = read_optional_string(map, "appointmentId")
            .into_inner()
            .filter(|id| !id.is_empty());

        // The appointment reference is what claims a slot.
        if flagged != appointment_id.is_some() {
            tracing::warn!(
                "Slot {:?} has isBooked={} but appointmentId={:?}",
                map.get("id"),
                flagged,
                appointment_id
            );
        }

        Ok(Self {
            id: read_string(map, "id").into_inner(),
            start_time: normalize_clock(&read_string(map, "startTime").into_inner()).into_inner(),
            end_time: normalize_clock(&read_string(map, "endTime").into_inner()).into_inner(),
            is_booked: appointment_id.is_some(),
            appointment_id,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub date: String,
    pub start_hour: Option<u32>,
    pub end_hour: Option<u32>,
    pub interval_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotQuery {
    pub available_only: Option<bool>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot {0} is already booked")]
    SlotAlreadyBooked(String),

    #[error("Invalid date: '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Schedule for {0} already has booked slots")]
    DayHasBookings(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for DoctorError {
    fn from(err: anyhow::Error) -> Self {
        DoctorError::DatabaseError(err.to_string())
    }
}
