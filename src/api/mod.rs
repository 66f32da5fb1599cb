pub mod routes;

// Re-export route handlers for convenience
pub use routes::app;
pub use routes::groups;
pub use routes::on_demand;
pub use routes::schedules;
pub use routes::state::AppState;
