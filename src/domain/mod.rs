pub mod identity;
pub mod merkle;
