//! Protocol converter (component F): bidirectional Claude<->`OpenAI` request
//! and response mapping, including the incremental stream converter.
//!
//! This crate is a pure function library save for [`stream::StreamConverter`],
//! which holds the small amount of state one in-flight stream needs.

pub mod claude;
mod convert;
mod direction;
mod error;
pub mod openai;
pub mod stream;
pub mod tokens;

pub use convert::{claude_request_to_openai, openai_response_to_claude};
pub use direction::should_translate;
pub use error::{ConvertError, Stage};
pub use stream::{StreamConverter, extract_sse_data, render_sse_event};
pub use tokens::estimate_tokens;
