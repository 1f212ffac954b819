// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use futures::future::try_join;
use futures::TryFutureExt;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::{DoctorService, ScheduleService};
use notification_cell::models::{Notification, NotificationType};
use notification_cell::services::{NotificationPublisher, NotificationService};
use patient_cell::services::PatientService;
use shared_database::{AppState, RealtimeDatabase};
use shared_models::auth::AuthUser;
use shared_models::dates::{normalize_day, now_millis};
use shared_models::record::{decode_children, Record};
use shared_utils::validation::validate_uid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    db: RealtimeDatabase,
    schedule: ScheduleService,
    doctors: DoctorService,
    patients: PatientService,
    lifecycle: AppointmentLifecycleService,
    publisher: Arc<dyn NotificationPublisher>,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self::with_publisher(state, Arc::new(NotificationService::new(state)))
    }

    pub fn with_publisher(state: &AppState, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self {
            db: state.db.clone(),
            schedule: ScheduleService::new(state),
            doctors: DoctorService::new(state),
            patients: PatientService::new(state),
            lifecycle: AppointmentLifecycleService::new(),
            publisher,
        }
    }

    /// Books a free slot for `patient_id`.
    ///
    /// The slot read and the claim are separate requests, so two callers
    /// racing for the same slot can both succeed.
    pub async fn book_appointment(
        &self,
        patient_id: &str,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking slot {} on {} with doctor {} for patient {}",
            request.slot_id, request.date, request.doctor_id, patient_id
        );

        let date = validate_booking_request(patient_id, &request)?;

        let slot = self
            .schedule
            .get_slot(&request.doctor_id, &date, &request.slot_id, auth_token)
            .await?;
        if slot.is_booked {
            return Err(AppointmentError::SlotAlreadyBooked(slot.id));
        }

        let (doctor, patient) = try_join(
            self.doctors
                .get_doctor(&request.doctor_id, auth_token)
                .map_err(AppointmentError::from),
            self.patients
                .get_patient(patient_id, auth_token)
                .map_err(AppointmentError::from),
        )
        .await?;

        let now = now_millis();
        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor.uid.clone(),
            doctor_name: doctor.display_name(),
            patient_id: patient.uid.clone(),
            patient_name: patient.name.clone(),
            date: date.clone(),
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            fee: doctor.consultation_fee,
            status: AppointmentStatus::Pending,
            symptoms: request.symptoms.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        self.schedule
            .claim_slot(&request.doctor_id, &date, &request.slot_id, &appointment.id, auth_token)
            .await?;

        if let Err(e) = self
            .db
            .put(&Appointment::path(&appointment.id), Some(auth_token), appointment.to_value())
            .await
        {
            warn!("Failed to store appointment {}, releasing slot: {}", appointment.id, e);
            if let Err(release_err) = self
                .schedule
                .release_for_appointment(&request.doctor_id, &date, &appointment.id, auth_token)
                .await
            {
                warn!("Slot release after failed booking also failed: {}", release_err);
            }
            return Err(e.into());
        }

        info!("Appointment {} booked ({} {})", appointment.id, appointment.date, appointment.start_time);

        self.notify(
            &appointment.doctor_id,
            NotificationType::AppointmentBooked,
            format!(
                "{} booked {} at {}",
                appointment.patient_name, appointment.date, appointment.start_time
            ),
            &appointment,
            auth_token,
        )
        .await;

        Ok(appointment)
    }

    pub async fn get_appointment(&self, id: &str, auth_token: &str) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", id);

        if !validate_uid(id) {
            return Err(AppointmentError::ValidationError(format!("Invalid appointment id: '{}'", id)));
        }

        let node = self
            .db
            .get(&Appointment::path(id), Some(auth_token))
            .await?
            .filter(|node| node.is_object())
            .ok_or(AppointmentError::NotFound)?;

        Appointment::from_value(&node).map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    /// Reads an appointment the caller is a party to.
    pub async fn get_for_user(&self, id: &str, user: &AuthUser) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(id, &user.token).await?;
        if !appointment.involves(&user.id) && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(appointment)
    }

    pub async fn confirm_appointment(&self, id: &str, user: &AuthUser) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(id, &user.token).await?;
        ensure_doctor_or_admin(&appointment, user)?;

        let updated = self
            .transition(appointment, AppointmentStatus::Confirmed, &user.token)
            .await?;

        self.notify(
            &updated.patient_id,
            NotificationType::AppointmentConfirmed,
            format!(
                "Your appointment with {} on {} at {} is confirmed",
                updated.doctor_name, updated.date, updated.start_time
            ),
            &updated,
            &user.token,
        )
        .await;

        Ok(updated)
    }

    pub async fn complete_appointment(&self, id: &str, user: &AuthUser) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(id, &user.token).await?;
        ensure_doctor_or_admin(&appointment, user)?;

        let updated = self
            .transition(appointment, AppointmentStatus::Completed, &user.token)
            .await?;

        self.notify(
            &updated.patient_id,
            NotificationType::AppointmentCompleted,
            format!("Your appointment with {} on {} is complete", updated.doctor_name, updated.date),
            &updated,
            &user.token,
        )
        .await;

        Ok(updated)
    }

    /// Cancels and frees the slot the appointment held. The other party is
    /// notified: the doctor when the patient cancels, the patient otherwise.
    pub async fn cancel_appointment(&self, id: &str, user: &AuthUser) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(id, &user.token).await?;
        if !appointment.involves(&user.id) && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        let updated = self
            .transition(appointment, AppointmentStatus::Cancelled, &user.token)
            .await?;

        // The cancellation is already stored; a stuck slot must not hide it.
        if let Err(e) = self
            .schedule
            .release_for_appointment(&updated.doctor_id, &updated.date, &updated.id, &user.token)
            .await
        {
            warn!("Appointment {} cancelled but its slot was not released: {}", updated.id, e);
        }

        let (recipient, message) = if user.id == updated.patient_id {
            (
                &updated.doctor_id,
                format!(
                    "{} cancelled {} at {}",
                    updated.patient_name, updated.date, updated.start_time
                ),
            )
        } else {
            (
                &updated.patient_id,
                format!(
                    "Your appointment with {} on {} at {} was cancelled",
                    updated.doctor_name, updated.date, updated.start_time
                ),
            )
        };
        self.notify(recipient, NotificationType::AppointmentCancelled, message, &updated, &user.token)
            .await;

        Ok(updated)
    }

    pub async fn get_patient_appointments(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.list_by("patientId", patient_id, auth_token).await
    }

    pub async fn get_doctor_appointments(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.list_by("doctorId", doctor_id, auth_token).await
    }

    async fn list_by(&self, child: &str, uid: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments where {} = {}", child, uid);

        if !validate_uid(uid) {
            return Err(AppointmentError::ValidationError(format!("Invalid {}: '{}'", child, uid)));
        }

        let children = self
            .db
            .query_equal(Appointment::COLLECTION, child, uid, Some(auth_token))
            .await?;

        let mut appointments: Vec<Appointment> = decode_children(children);
        appointments.sort_by_key(Appointment::schedule_key);
        Ok(appointments)
    }

    async fn transition(
        &self,
        mut appointment: Appointment,
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle
            .validate_status_transition(appointment.status, target)?;

        let updated_at = now_millis();
        self.db
            .patch(
                &Appointment::path(&appointment.id),
                Some(auth_token),
                json!({ "status": target.to_string(), "updatedAt": updated_at }),
            )
            .await?;

        info!("Appointment {} moved {} -> {}", appointment.id, appointment.status, target);
        appointment.status = target;
        appointment.updated_at = updated_at;
        Ok(appointment)
    }

    /// Delivery problems are logged; they never undo the status change.
    async fn notify(
        &self,
        recipient_id: &str,
        kind: NotificationType,
        message: String,
        appointment: &Appointment,
        auth_token: &str,
    ) {
        let notification = Notification::new(
            kind,
            kind.default_title(),
            message,
            Some(appointment.id.clone()),
            now_millis(),
        );
        if let Err(e) = self.publisher.publish(recipient_id, notification, auth_token).await {
            warn!("Failed to notify {} about appointment {}: {}", recipient_id, appointment.id, e);
        }
    }
}

/// Checks every identifier that ends up in a storage path and returns the
/// canonical booking date.
fn validate_booking_request(
    patient_id: &str,
    request: &BookAppointmentRequest,
) -> Result<String, AppointmentError> {
    let ids = [
        ("patientId", patient_id),
        ("doctorId", request.doctor_id.as_str()),
        ("slotId", request.slot_id.as_str()),
    ];
    for (field, value) in ids {
        if !validate_uid(value) {
            return Err(AppointmentError::ValidationError(format!("Invalid {}: '{}'", field, value)));
        }
    }

    normalize_day(&request.date).value().ok_or_else(|| {
        AppointmentError::ValidationError(format!(
            "Invalid date: '{}' (expected YYYY-MM-DD)",
            request.date
        ))
    })
}

fn ensure_doctor_or_admin(appointment: &Appointment, user: &AuthUser) -> Result<(), AppointmentError> {
    if appointment.doctor_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppointmentError::Unauthorized)
    }
}
