pub mod realtime;
pub mod state;

pub use realtime::RealtimeDatabase;
pub use state::AppState;
