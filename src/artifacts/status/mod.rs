pub mod file_change;
pub mod inspector;
pub mod status_info;
