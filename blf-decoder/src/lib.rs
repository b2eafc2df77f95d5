//! BLF Decoder Library
//!
//! A stateless, reusable library for decoding Vector BLF (Binary Logging
//! Format) files into CAN, CAN-FD, remote and error frame records.
//!
//! # Architecture
//!
//! Decoding is a plain pull-based iterator:
//! - The file header is validated when the reader is created
//! - Log containers are inflated one at a time
//! - Objects inside each container are decoded into [`Record`]s on demand
//!
//! The library does NOT:
//! - Write output files
//! - Decode signals from DBC or ARXML definitions
//! - Write BLF files
//!
//! Output formatting is in the application layer (blf-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use blf_decoder::{Decoder, DecoderConfig, Record};
//! use std::path::Path;
//!
//! let config = DecoderConfig::new().with_channel_filter(vec![0, 1]);
//! let decoder = Decoder::with_config(config);
//!
//! let records = decoder.decode_file(Path::new("trace.blf")).unwrap();
//! for record in records {
//!     match record {
//!         Ok(Record::Error(frame)) => println!("Error frame on channel {}", frame.channel),
//!         Ok(record) => println!("{:.6} {:?}", record.timestamp(), record.arbitration_id()),
//!         Err(e) => eprintln!("Decode error: {}", e),
//!     }
//! }
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod formats;
pub mod types;

// Re-export main types for convenience
pub use config::{CompressionPolicy, DecoderConfig};
pub use decoder::{Decoder, Records};
pub use formats::{BlfReader, FileHeader, ReaderStats};
pub use types::{
    dlc_to_byte_length, CanFdMessage, CanMessage, DecoderError, Direction, ErrorFrame,
    Record, RemoteFrame, Result, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
