//! Prompt Builder (§4.4): brand-weighted Thompson sampling over the fixed
//! 14-section component order, the Model-Gender Arbiter (§4.6), and the
//! in-process prompt cache.

pub mod builder;
pub mod cache;
pub mod defaults;
pub mod gender;

pub use builder::PromptBuilder;
pub use cache::{cache_key, PromptCache};
pub use gender::{resolve as resolve_gender, ResolvedGender};
