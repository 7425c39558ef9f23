pub mod classrooms;
pub mod enrollments;
pub mod join_code;
pub mod leave_requests;
pub mod reports;

pub use classrooms::ClassroomService;
pub use enrollments::EnrollmentService;
pub use join_code::{JoinCodeGenerator, RandomCodeGenerator};
pub use leave_requests::LeaveRequestService;
pub use reports::{AttendanceRow, ReportService};
