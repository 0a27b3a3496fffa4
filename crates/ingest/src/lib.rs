//! HeadPut Ingest
//!
//! Receives measurement samples from the external capture process and
//! feeds them into the gesture engine:
//! - **Codec:** the `DATA:` / `IMAGE:` line protocol plus legacy plain JSON
//! - **Listener:** a single-client TCP server with a shared stop flag

pub mod codec;
pub mod listener;

pub use codec::{decode_line, encode_sample, read_samples, Frame};
pub use listener::{ListenerStats, SampleListener};
