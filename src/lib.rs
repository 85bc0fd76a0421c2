//! Pik intercom camera bridge library.
//!
//! Exposes the cameras of Pik intercom devices (vendor photo endpoint and
//! RTSP stream) as camera entities of a home-automation host.

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod host;
pub mod media;

#[cfg(test)]
mod testing;
