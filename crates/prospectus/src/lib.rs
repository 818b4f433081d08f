//! Personalised prospectus engine.
//!
//! A family's enquiry form is validated into a [`personalisation::FamilyProfile`], each
//! school's visibility rules decide which prospectus modules the family sees, and a guided
//! tour is derived from the visible set. The [`workflows::prospectus`] module wires this into
//! storage and an HTTP router; [`narration`] keeps generated copy behind a fallible boundary.

pub mod config;
pub mod error;
pub mod narration;
pub mod personalisation;
pub mod telemetry;
pub mod workflows;
