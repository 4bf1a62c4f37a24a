pub mod bounds;
pub mod config;
pub mod constants;
pub mod geo;
pub mod history;
pub mod region;
pub mod transform;
pub mod zoom;
