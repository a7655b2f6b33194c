//! Hex-grid climate generation library
//!
//! Builds an odd-r hexagon mesh over a heightmap and runs the climate
//! pipeline across it: ocean detection, prevailing wind, humidity
//! transport, river and pool routing, and biome assignment.

pub mod biomes;
pub mod config;
pub mod error;
pub mod generator;
pub mod island;
pub mod mesh;
pub mod rivers;
pub mod simulation;
pub mod weather;

pub use error::{Result, SimError};
