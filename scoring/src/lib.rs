//! Rule-based fraud scoring.
//!
//! A scoring call resolves the referenced order, looks up the owner's average
//! ticket, runs the ordered rule table and maps the clamped score to a
//! decision band.
pub mod model;
pub mod processor;
pub mod scorers;
pub mod storage;
