//! Rankroute Core Library
//!
//! Client-side routing of chat requests across several LLM providers. Each
//! provider carries a rank and a request quota; a query goes to the
//! highest-ranked provider that still has budget and falls back down the
//! list on failure.
//!
//! ```no_run
//! use rankroute_core::config;
//! use rankroute_core::protocol::{Message, QueryOptions};
//! use rankroute_core::providers::Router;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = config::load_from_yaml("router.yaml")?;
//! let router = Router::from_config(&config, None)?;
//!
//! let answer = router
//!     .query(&[Message::user("Hello!")], &QueryOptions::default())
//!     .await?;
//! println!("{} answered: {}", answer.model, answer.content);
//!
//! router.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod tools;

/// Returns the version of the Rankroute Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
