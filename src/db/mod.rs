pub mod classrooms;
pub mod enrollments;
pub mod leave_requests;
pub mod users;
