// src/lib.rs
//! FM deviation monitor.
//!
//! A free-running ADC stream of a demodulated tune tone is reduced to two
//! display numbers, maximum deviation and average DC level. See [`monitor`]
//! for the sampling core; everything else feeds it or presents its output.
pub mod config;
pub mod display;
pub mod drivers;
pub mod engine;
pub mod gui;
pub mod monitor;
pub mod recorder;
pub mod types;
