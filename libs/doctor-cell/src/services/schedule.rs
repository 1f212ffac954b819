use serde_json::Value;
use tracing::{debug, info, warn};

use shared_database::{AppState, RealtimeDatabase};
use shared_models::dates::normalize_day;
use shared_models::record::{decode_children, Record, RecordMap};
use shared_utils::validation::validate_uid;

use crate::models::{DoctorError, Slot};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;
pub const WORKDAY_START_HOUR: u32 = 9;
pub const WORKDAY_END_HOUR: u32 = 17;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Partitions working hours into fixed-length slots.
pub struct SlotGenerator;

impl SlotGenerator {
    /// Slots covering `[start_hour, end_hour)` in `interval_minutes` steps,
    /// numbered from 1.
    ///
    /// Only whole slots are produced: when the range is not a multiple of the
    /// interval the remainder is left uncovered. An empty or inverted range,
    /// or a zero interval, yields no slots rather than an error.
    pub fn generate_slots(start_hour: u32, end_hour: u32, interval_minutes: u32) -> Vec<Slot> {
        let start = start_hour.saturating_mul(60);
        let end = end_hour.saturating_mul(60).min(MINUTES_PER_DAY);

        if interval_minutes == 0 || end <= start {
            return Vec::new();
        }

        let mut slots = Vec::with_capacity(((end - start) / interval_minutes) as usize);
        let mut slot_start = start;
        while let Some(slot_end) = slot_start.checked_add(interval_minutes).filter(|e| *e <= end) {
            let number = slots.len() as u32 + 1;
            slots.push(Slot::new(number, slot_start, slot_end));
            slot_start = slot_end;
        }
        slots
    }

    /// The 09:00 to 17:00 working day.
    pub fn generate_working_day(interval_minutes: u32) -> Vec<Slot> {
        Self::generate_slots(WORKDAY_START_HOUR, WORKDAY_END_HOUR, interval_minutes)
    }
}

/// Reads and writes a doctor's per-day slot tables.
pub struct ScheduleService {
    db: RealtimeDatabase,
}

impl ScheduleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    /// Generates and stores the slots for one day, replacing any unbooked
    /// table already there.
    pub async fn setup_day(
        &self,
        doctor_id: &str,
        date: &str,
        start_hour: u32,
        end_hour: u32,
        interval_minutes: u32,
        auth_token: &str,
    ) -> Result<Vec<Slot>, DoctorError> {
        let date = checked_day(doctor_id, date)?;

        debug!(
            "Setting up schedule for doctor {} on {} ({}:00-{}:00, {} min)",
            doctor_id, date, start_hour, end_hour, interval_minutes
        );

        let existing = self.list_slots(doctor_id, &date, auth_token).await?;
        if existing.iter().any(|slot| slot.is_booked) {
            warn!("Refusing to regenerate slots for {} on {}: bookings exist", doctor_id, date);
            return Err(DoctorError::DayHasBookings(date));
        }

        let slots = SlotGenerator::generate_slots(start_hour, end_hour, interval_minutes);

        let mut table = RecordMap::new();
        for slot in &slots {
            table.insert(slot.id.clone(), slot.to_value());
        }

        self.db
            .put(&Slot::day_path(doctor_id, &date), Some(auth_token), Value::Object(table))
            .await?;

        info!("Stored {} slots for doctor {} on {}", slots.len(), doctor_id, date);
        Ok(slots)
    }

    /// All slots of a day ordered by start time. Empty when the day has no table.
    pub async fn list_slots(
        &self,
        doctor_id: &str,
        date: &str,
        auth_token: &str,
    ) -> Result<Vec<Slot>, DoctorError> {
        let date = checked_day(doctor_id, date)?;

        let children = self
            .db
            .children(&Slot::day_path(doctor_id, &date), Some(auth_token))
            .await?;

        let mut slots: Vec<Slot> = decode_children(children);
        slots.sort_by_key(|slot| slot.start_minutes());
        Ok(slots)
    }

    pub async fn available_slots(
        &self,
        doctor_id: &str,
        date: &str,
        auth_token: &str,
    ) -> Result<Vec<Slot>, DoctorError> {
        let slots = self.list_slots(doctor_id, date, auth_token).await?;
        Ok(slots.into_iter().filter(Slot::is_available).collect())
    }

    pub async fn get_slot(
        &self,
        doctor_id: &str,
        date: &str,
        slot_id: &str,
        auth_token: &str,
    ) -> Result<Slot, DoctorError> {
        let date = checked_day(doctor_id, date)?;
        if !validate_uid(slot_id) {
            return Err(DoctorError::ValidationError(format!("Invalid slot id: '{}'", slot_id)));
        }

        let node = self
            .db
            .get(&Slot::path(doctor_id, &date, slot_id), Some(auth_token))
            .await?
            .ok_or(DoctorError::SlotNotFound)?;

        // Only a slot object counts; a scalar here is a field of something else.
        if !node.is_object() {
            warn!("Node at slot {} on {} is not a slot", slot_id, date);
            return Err(DoctorError::SlotNotFound);
        }

        let mut slot = Slot::from_value(&node).map_err(|e| DoctorError::DatabaseError(e.to_string()))?;
        if slot.id.is_empty() {
            slot.id = slot_id.to_string();
        } else if slot.id != slot_id {
            warn!("Slot {} on {} is stored with id {:?}", slot_id, date, slot.id);
            return Err(DoctorError::SlotNotFound);
        }
        Ok(slot)
    }

    pub async fn save_slot(
        &self,
        doctor_id: &str,
        date: &str,
        slot: &Slot,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let date = checked_day(doctor_id, date)?;
        if !validate_uid(&slot.id) {
            return Err(DoctorError::ValidationError(format!("Invalid slot id: '{}'", slot.id)));
        }

        self.db
            .put(&Slot::path(doctor_id, &date, &slot.id), Some(auth_token), slot.to_value())
            .await?;
        Ok(())
    }

    /// Marks a free slot as claimed by `appointment_id`.
    pub async fn claim_slot(
        &self,
        doctor_id: &str,
        date: &str,
        slot_id: &str,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<Slot, DoctorError> {
        let mut slot = self.get_slot(doctor_id, date, slot_id, auth_token).await?;
        if !slot.book(appointment_id) {
            return Err(DoctorError::SlotAlreadyBooked(slot.id));
        }
        self.save_slot(doctor_id, date, &slot, auth_token).await?;
        debug!("Slot {} on {} claimed by {}", slot.id, date, appointment_id);
        Ok(slot)
    }

    /// Frees whichever slot of the day references `appointment_id`.
    /// Returns the released slot, or `None` if no slot pointed at it.
    pub async fn release_for_appointment(
        &self,
        doctor_id: &str,
        date: &str,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<Option<Slot>, DoctorError> {
        let slots = self.list_slots(doctor_id, date, auth_token).await?;
        let Some(mut slot) = slots
            .into_iter()
            .find(|slot| slot.appointment_id.as_deref() == Some(appointment_id))
        else {
            warn!("No slot on {} references appointment {}", date, appointment_id);
            return Ok(None);
        };

        slot.release();
        self.save_slot(doctor_id, date, &slot, auth_token).await?;
        debug!("Slot {} on {} released", slot.id, date);
        Ok(Some(slot))
    }
}

/// Checks the path segments of a day table and returns the canonical date.
fn checked_day(doctor_id: &str, date: &str) -> Result<String, DoctorError> {
    if !validate_uid(doctor_id) {
        return Err(DoctorError::ValidationError(format!("Invalid doctor id: '{}'", doctor_id)));
    }
    normalize_day(date)
        .value()
        .ok_or_else(|| DoctorError::InvalidDate(date.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_working_day_has_sixteen_half_hours() {
        let slots = SlotGenerator::generate_slots(9, 17, DEFAULT_INTERVAL_MINUTES);
        assert_eq!(slots.len(), 16);
        assert_eq!((slots[0].start_time.as_str(), slots[0].end_time.as_str()), ("09:00", "09:30"));
        let last = slots.last().unwrap();
        assert_eq!((last.start_time.as_str(), last.end_time.as_str()), ("16:30", "17:00"));
        assert_eq!(SlotGenerator::generate_working_day(DEFAULT_INTERVAL_MINUTES), slots);
    }

    #[test]
    fn uneven_interval_drops_partial_slot() {
        let slots = SlotGenerator::generate_slots(9, 17, 45);
        assert_eq!(slots.len(), 10);
        assert_eq!(slots.last().unwrap().end_time, "16:30");
        assert_eq!(slots.last().unwrap().id, "slot_10");
    }

    #[test]
    fn slots_are_contiguous_numbered_and_free() {
        for (start, end, interval) in [(8, 12, 20), (0, 24, 60), (13, 18, 25), (7, 8, 7)] {
            let slots = SlotGenerator::generate_slots(start, end, interval);
            assert_eq!(slots.len() as u32, (end - start) * 60 / interval);
            assert_eq!(slots[0].start_time, format!("{:02}:00", start));
            for (i, pair) in slots.windows(2).enumerate() {
                assert_eq!(pair[0].end_time, pair[1].start_time);
                assert_eq!(pair[0].id, format!("slot_{}", i + 1));
            }
            assert!(slots.iter().all(|s| !s.is_booked && s.appointment_id.is_none()));
            assert!(slots.iter().all(|s| s.duration_minutes() == interval));
        }
    }

    #[test]
    fn invalid_ranges_are_silently_empty() {
        assert!(SlotGenerator::generate_slots(17, 9, 30).is_empty());
        assert!(SlotGenerator::generate_slots(9, 9, 30).is_empty());
        assert!(SlotGenerator::generate_slots(9, 17, 0).is_empty());
        assert!(SlotGenerator::generate_slots(9, 10, 90).is_empty());
    }

    #[test]
    fn huge_intervals_do_not_overflow() {
        assert!(SlotGenerator::generate_slots(9, 17, u32::MAX).is_empty());
        assert!(SlotGenerator::generate_slots(0, u32::MAX, u32::MAX - 1).is_empty());
        assert!(SlotGenerator::generate_slots(u32::MAX, u32::MAX, 30).is_empty());

        let whole_day = SlotGenerator::generate_slots(0, u32::MAX, 24 * 60);
        assert_eq!(whole_day.len(), 1);
        assert_eq!(whole_day[0].end_time, "24:00");
    }

    #[test]
    fn day_paths_reject_unsafe_segments() {
        assert_eq!(checked_day("doc-1", " 2030-05-20 ").unwrap(), "2030-05-20");
        assert!(matches!(checked_day("doc-1/x", "2030-05-20"), Err(DoctorError::ValidationError(_))));
        assert!(matches!(checked_day("", "2030-05-20"), Err(DoctorError::ValidationError(_))));
        assert!(matches!(checked_day("doc-1", "2030-05-20/slot_1"), Err(DoctorError::InvalidDate(_))));
    }

    #[test]
    fn range_is_capped_at_midnight() {
        let slots = SlotGenerator::generate_slots(23, 30, 30);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end_time, "24:00");
    }
}
