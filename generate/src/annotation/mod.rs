//! Annotation comment grammar.
//!
//! ```text
//! line      := {separator} section+
//! section   := "@" identity (value | option)*
//! option    := identity "=" identity
//! value     := identity                  ; first bare identity only
//! identity  := quoted | bareword
//! separator := '#' | ';' | ' '
//! ```

pub mod lexer;
mod section;

pub use section::{Section, SectionOption, parse_comment, parse_line};
