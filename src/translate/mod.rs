pub mod command;
pub mod translator;
