//! The assistant's tools. Pure text builders live next to the one or two
//! that reach out to HTTP services.

use thiserror::Error;

pub mod chat;
pub mod gear;
pub mod knowledge;
pub mod plan;
pub mod rental;
pub mod trail_analysis;
pub mod wardrobe;
pub mod weather;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Api { status: u16, body: String },
}
