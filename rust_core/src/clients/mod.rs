pub mod openrouter;
pub mod polymarket;
pub mod x;

// Re-export commonly used types
pub use openrouter::{ChatCompletion, OpenRouterClient, OpenRouterConfig};
pub use polymarket::{GammaClient, MarketFeed};
pub use x::{PaperPublisher, PollPublisher, PollSpec, XClient};
