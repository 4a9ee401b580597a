//! # nalscope-bitstream
//!
//! Bit-level parsing of NAL unit based video elementary streams with an
//! annotated syntax tree of every decoded symbol.
//!
//! ## Features
//!
//! - Bit cursor with fixed-width and Exp-Golomb reads over de-escaped RBSP data
//! - Symbol reader that validates each value and logs name, value, coding,
//!   raw bits and meaning into a [`SyntaxTree`]
//! - Streaming start code scanner over any [`ByteSource`]
//! - HEVC NAL headers, VPS/SPS/PPS, slice segment headers and picture order count
//!
//! Optional cargo features: `serialize` (serde support for records and the
//! tree), `tracing` (debug and warning logs), `test-util` (bitstream writers).
//!
//! ## Example
//!
//! ```no_run
//! use nalscope_bitstream::{DecodingSession, NalUnitScanner, SyntaxTree};
//!
//! let data = std::fs::read("stream.hevc").unwrap();
//! let mut scanner = NalUnitScanner::new(data);
//! let mut session = DecodingSession::new();
//! let mut tree = SyntaxTree::new("stream.hevc");
//!
//! let summary = session.scan(&mut scanner, Some(&mut tree), None).unwrap();
//! println!("{} units, POC order {:?}", summary.units, session.poc_list());
//! print!("{}", tree.render());
//! ```

pub mod bits;
pub mod check;
pub mod error;
pub mod hevc;
pub mod reader;
pub mod scanner;
pub mod session;
pub mod tree;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use bits::{BitCursor, BitPosition};
pub use check::{Check, Options, RangeCheckResult};
pub use error::{BitstreamError, Result};
pub use hevc::{NalHeader, NalUnit, NalUnitType, ParameterSets, ParsedUnit};
pub use reader::SymbolReader;
pub use scanner::{ByteSource, NalUnitScanner, RawUnit, ScanState};
pub use session::{DecodingSession, ScanSummary, UnitError};
pub use tree::{NodeId, SyntaxNode, SyntaxTree};
