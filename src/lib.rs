//! Decoder for Minew BLE sensor beacon advertisements.
//!
//! Raw advertisement PDUs (or their hex encoding) go in, [`Reading`]s come
//! out. Decoding is pure and stateless; see [`Decoder`] for the pipeline and
//! [`batch`] for line-oriented sources.

pub mod batch;
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod models;
pub mod tracker;
pub mod utils;

pub use bluetooth::{Decoder, KeyMaterial};
pub use config::DecoderConfig;
pub use error::{CipherError, ConfigError, DecodeFault};
pub use models::{Confidence, FrameKind, Reading};
