pub mod assert_report;
pub mod build;
pub mod drift_check;
pub mod table_check;
