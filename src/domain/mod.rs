pub mod commitment;
pub mod merkle;
pub mod model;
pub mod verify;
