//! Terminal viewer for real-estate parcels ("lotes") drawn on a braille map.

pub mod app;
pub mod braille;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod geo;
pub mod map;
pub mod panorama;
pub mod presenter;
pub mod ui;
