pub mod doctor;
pub mod schedule;

pub use doctor::DoctorService;
pub use schedule::{ScheduleService, SlotGenerator};
