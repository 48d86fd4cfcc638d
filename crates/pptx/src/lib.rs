//! PPTX (Office Open XML) deck loader.
//!
//! A .pptx file is a ZIP archive of XML parts. Slides are read in the order
//! `ppt/presentation.xml` lists them, with speaker notes taken from each
//! slide's notes part.

pub mod parser;

pub use parser::PptxParser;
