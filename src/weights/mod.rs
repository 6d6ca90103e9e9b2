//! Weight Store (§4.7): RLHF-style token weight learning shared by the
//! feedback loop and the Prompt Builder's Thompson sampler.

pub mod store;

pub use store::{FeedbackPayload, WeightStore};
