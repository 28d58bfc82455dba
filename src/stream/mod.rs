//! Incremental extraction of weather records from a streamed JSON body.
//!
//! The PWS API wraps the few records we need in a very large document, so
//! nothing here materializes the response: the scanner skips to the array,
//! the decoder lifts one element at a time into a bounded buffer.

pub mod decoder;
pub mod scanner;
pub mod source;

pub use decoder::decode_one;
pub use scanner::{advance_past_element, locate_array};
pub use source::{ByteSource, ResponseSource};
#[cfg(test)]
pub use source::SliceSource;
