//! Generator Adapter (§4.8): interface only. `GeneratorAdapter` itself
//! lives in `crate::types::generation`; this module holds the one test
//! double this crate ships.

pub mod mock;

pub use mock::MockAdapter;
