//! Core markup reading primitives
//!
//! This module contains the fundamental building blocks for parsing:
//! - Scanner: memchr-accelerated delimiter detection
//! - Tokenizer: State machine for HTML token extraction
//! - Entities: Character reference decoding with Cow (zero-copy when possible)
//! - Attributes: Attribute parsing and extraction

pub mod attributes;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
