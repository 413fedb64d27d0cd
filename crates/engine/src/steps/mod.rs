//! Concrete pipeline steps.

pub mod verify_input;
