//! # Soundpipe Core
//!
//! Core types and utilities for the Soundpipe audio codec library.
//!
//! This crate provides the fundamental building blocks used across all
//! Soundpipe components:
//! - Error handling types
//! - Sample format and channel layout descriptions
//! - PCM block storage and typed sample conversion
//! - Encoded packet representation and wire framing
//! - Decode stop-control signalling
//! - Test-signal synthesis

pub mod block;
pub mod control;
pub mod error;
pub mod packet;
pub mod sample;
pub mod signal;

pub use block::{PcmBlock, PcmSample};
pub use control::DecodeControl;
pub use error::{Error, Result};
pub use packet::Packet;
pub use sample::{ChannelLayout, Interleave, SampleFormat};
