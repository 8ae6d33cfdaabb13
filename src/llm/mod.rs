#[cfg(feature = "gemini")]
pub mod client;
pub mod gateway;
pub mod operations;
pub mod prompts;
pub mod types;

#[cfg(feature = "gemini")]
pub use client::*;
pub use gateway::*;
pub use operations::*;
pub use prompts::*;
pub use types::*;
