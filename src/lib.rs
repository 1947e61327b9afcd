//! Subtrans - subtitle line translation adapter
//!
//! Reads a JSON list of subtitle lines, makes sure a translation model for the
//! requested language pair is installed, and writes the translated list back as
//! JSON. Translation itself is delegated to Argos Translate or LibreTranslate.

pub mod adapter;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod payload;
