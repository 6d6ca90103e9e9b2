//! Style Profile Synthesizer (§4.2-§4.3): turns a portfolio's descriptors
//! into one `StyleProfile` and its on-demand Brand DNA.

pub mod alias;
pub mod brand_dna;
pub mod synthesizer;

pub use synthesizer::{ProfileSynthesizer, SynthesisError};
