//! # Error Types
//!
//! This module defines all error types for the beatgrid converter.
//!
//! The tempo map and beat grid themselves never fail: degenerate files (no
//! tempo, no time signature, no notes) fall back to defaults. Every variant
//! here comes from a collaborator around the core.
//!
//! ## Error Types
//! - `NoInput` - No file was given, or the file was empty
//! - `Decode` - The bytes are not a Standard MIDI File
//! - `Io` - Reading or writing a file failed
//! - `Config` - Invalid YAML or export options
//! - `Xml` - The plugin descriptor could not be written or read
//! - `Payload` - A descriptor chunk is not valid base64 / UTF-8
//! - `Serialize` - The result could not be written as YAML
//!
//! ## Usage
//! ```rust,no_run
//! use beatgrid::{convert, BeatGridError};
//!
//! # let bytes: Vec<u8> = Vec::new();
//! match convert(&bytes) {
//!     Ok(result) => println!("{} beats", result.beats.len()),
//!     Err(BeatGridError::Decode(message)) => eprintln!("Not a MIDI file: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeatGridError {
    /// No source was supplied.
    ///
    /// # Example
    /// ```
    /// # use beatgrid::BeatGridError;
    /// assert_eq!(BeatGridError::NoInput.to_string(), "No MIDI input supplied");
    /// ```
    #[error("No MIDI input supplied")]
    NoInput,

    /// The MIDI decoder rejected the bytes.
    ///
    /// # Example
    /// ```
    /// # use beatgrid::BeatGridError;
    /// let err = BeatGridError::Decode("invalid header".to_string());
    /// assert_eq!(err.to_string(), "Failed to decode MIDI file: invalid header");
    /// ```
    #[error("Failed to decode MIDI file: {0}")]
    Decode(String),

    /// File I/O failure, with the path that caused it.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid export configuration.
    ///
    /// # Example
    /// ```
    /// # use beatgrid::BeatGridError;
    /// let err = BeatGridError::Config("chunk-size must be greater than 0".to_string());
    /// assert_eq!(err.to_string(), "Invalid config: chunk-size must be greater than 0");
    /// ```
    #[error("Invalid config: {0}")]
    Config(String),

    /// XML writer or reader failure.
    #[error("XML error: {0}")]
    Xml(String),

    /// A chunk in a plugin descriptor could not be decoded.
    #[error("Invalid plugin payload: {0}")]
    Payload(String),

    /// The conversion result could not be dumped as YAML.
    #[error("Failed to serialize result: {0}")]
    Serialize(String),
}
