pub mod attendance;
pub mod audit_log;
pub mod common;
pub mod holiday;
pub mod repository;
pub mod request;
pub mod user;

pub use attendance::AttendanceRepository;
pub use audit_log::AuditLogRepository;
pub use holiday::HolidayRepository;
pub use request::RequestRepository;
pub use user::{PurgeOutcome, UserChanges, UserListFilters, UserRepository};
