pub mod classroom;
pub mod enrollment;
pub mod leave_request;
pub mod user;

pub use classroom::{Classroom, CreateClassRequest, JoinRequest, UpdateClassRequest};
pub use enrollment::{Enrollment, RosterEntry};
pub use leave_request::{DateRange, DenyRequest, LeaveRequest, LeaveStatus};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, Role, User};
