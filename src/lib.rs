//! vMix APC GW - gateway between a vMix mixer and an Akai APC mini
//!
//! Mixer activator notifications drive the surface LEDs; button presses and
//! fader moves become mixer functions.

pub mod activator;
pub mod apc;
pub mod camera;
pub mod config;
pub mod dispatch;
pub mod midi;
pub mod mixer;
pub mod pager;
pub mod state;
pub mod virtual_surface;
pub mod watchdog;
