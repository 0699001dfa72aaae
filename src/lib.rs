pub mod app;
pub mod braille;
pub mod chart;
pub mod config;
pub mod data;
pub mod logging;
pub mod map;
pub mod proposal;
pub mod store;
pub mod ui;
pub mod workflow;
