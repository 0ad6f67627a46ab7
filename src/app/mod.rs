pub mod cockpit;
pub mod command;
