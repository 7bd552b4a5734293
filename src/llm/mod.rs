// Text-completion layer used by the generation endpoints

pub mod provider;
pub mod openai;
pub mod anthropic;

pub use provider::*;
