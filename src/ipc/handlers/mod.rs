pub mod auth;
pub mod core;
pub mod courses;
pub mod enrollments;
pub mod grades;
pub mod legacy;
pub mod people;
pub mod records;
pub mod reports;
