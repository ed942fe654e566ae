pub mod billing;
pub mod db;
pub mod study;
pub mod test_sessions;
pub mod usage;
