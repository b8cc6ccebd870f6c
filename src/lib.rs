//! Spaced repetition engine for vocabulary review
//!
//! Decides when each card should next be reviewed, estimates how well it is
//! remembered, and turns a sitting's worth of grades into updated schedules.
//! Storage and time are supplied by the host through [`CardStore`] and
//! [`Clock`]. Logging goes through the `log` facade; install a logger in the
//! host application to see it.

pub mod flashcards;

pub use flashcards::*;
