pub mod generator;
pub mod student_fixture;
