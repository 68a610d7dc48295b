//! LLM backend implementations
//!
//! The [`backend::FixBackend`] trait is the seam between the pipeline and the
//! reasoning service; [`genai_backend::GenAIBackend`] is the production
//! implementation, [`mock::MockFixBackend`] the scripted one for tests.

pub mod backend;
pub mod genai_backend;
pub mod mock;

pub use backend::{BackendError, FixBackend};
pub use genai_backend::{GenAIBackend, Provider};
