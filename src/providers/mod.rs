pub mod gemini;

pub use gemini::GeminiClientFactory;
