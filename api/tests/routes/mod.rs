mod enrollments_test;
mod health_test;
mod sessions_test;
