//! BoardGameGeek play-history client.
//!
//! Fetches a user's logged plays from the `xmlapi2/plays` endpoint page by
//! page and turns the XML into plain structs. The endpoint is undocumented
//! enough that the parser works on regular expressions rather than a schema.

pub mod client;
pub mod parse;

pub use client::{BggClient, BggConfig, PlaysSource};
pub use parse::{parse_plays_page, BggPlay, BggPlayer, PlaysPage};

/// Errors from talking to BGG.
#[derive(Debug, thiserror::Error)]
pub enum BggError {
    #[error("BGG request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("BGG returned HTTP {0}")]
    Status(u16),
    #[error("BGG blocked the request after trying {attempts} user agent(s)")]
    Blocked { attempts: usize },
    #[error("could not parse BGG response: {0}")]
    Parse(String),
}
