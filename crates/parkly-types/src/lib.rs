pub mod api;
pub mod models;

pub use models::{Actor, Capability, ParkingSlot, Role, SlotStatus, User, VehicleEntry};
