//! HTML slide document loader.
//!
//! Reads documents where each slide is an element with class `slide`,
//! optionally carrying a `data-slide` position and a `.slide-notes` block.

pub mod parser;

pub use parser::HtmlParser;
