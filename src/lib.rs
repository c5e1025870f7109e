//! Extracts SystemVerilog/Verilog module interfaces into IP-XACT 1685-2014
//! component descriptions.
//!
//! Parsing is delegated to the external `verible-verilog-syntax` binary; this
//! crate walks the exported concrete syntax tree to recover port directions,
//! data types, and packed/unpacked dimensions, builds the module instance
//! hierarchy across a batch of files, and emits (or updates) a component
//! document whose file set lists the sources in reverse dependency order.

#![deny(elided_lifetimes_in_paths)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod extract;
pub mod hierarchy;
pub mod interface;
pub mod syntax;
pub mod xact;
pub mod xml;

pub use interface::{Direction, Module, Parameter, Port, TypeDimension};
pub use syntax::{Node, VeribleParser};
