//! batch-synth: batch text-to-speech, voice cloning and page fetching CLI.
//!
//! This crate runs one external backend (a Coqui or Bark model server, an
//! XTTS v2 cloning server, or a reader proxy) over a list of work items and
//! writes one numbered output file per item.

pub mod backend;
pub mod cli;
pub mod config;
pub mod pipeline;
