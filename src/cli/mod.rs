pub mod analyze;
pub mod command;
pub mod frames;
pub mod info;
