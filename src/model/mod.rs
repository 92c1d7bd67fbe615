pub mod state;
pub mod vehicles;
