pub mod provider;
mod sse;

pub use provider::ChatCompletionsGenerator;
