pub mod app;
pub mod common;
pub mod groups;
pub mod on_demand;
pub mod schedules;
pub mod state;
