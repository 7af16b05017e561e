pub mod client;
pub mod collaborators;
pub mod prompts;
pub mod validation;

pub use client::*;
pub use collaborators::*;
pub use prompts::*;
pub use validation::*;
