//! Campaign endpoints: CRUD plus the lifecycle command surface.

pub mod crud;
pub mod lifecycle;
pub mod types;
