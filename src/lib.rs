//! # rosparse - RouterOS CLI Response Parser
//!
//! `rosparse` turns the free-form text that MikroTik RouterOS prints in
//! response to CLI commands into structured records. The layout of a response
//! depends on the command and the firmware version and carries no format tag,
//! so the parser detects it and falls back through a fixed chain of
//! strategies until one succeeds.
//!
//! ## Features
//!
//! - **Format Detection**: Terse, table, detail, export and `key: value` layouts
//! - **Fallback Chain**: Strategies are tried in priority order with a per-attempt deadline
//! - **Strategy Cache**: Remembers which strategy worked for a resource path and command
//! - **Field Normalization**: Device names such as `listen-port` become `listenPort`
//! - **Typed Values**: Opt-in conversion of durations, byte sizes, booleans and numbers
//! - **Partial Results**: Malformed lines become warnings instead of failing the call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rosparse::{CommandType, Normalizer, ParseHints, ParserConfig, ParserService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ParserService::new(
//!         ParserConfig::default(),
//!         Arc::new(Normalizer::with_defaults()),
//!     );
//!
//!     let raw = ".id=*1;name=wg0;listen-port=51820;mtu=1420";
//!     let hints = ParseHints::new(CommandType::PrintTerse, "/interface/wireguard");
//!     let result = service.parse_response(raw, &hints).await?;
//!
//!     for resource in &result.resources {
//!         println!("{:?}", resource.get("listenPort"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`service::ParserService`] - Dispatches output to the strategy chain
//! - [`strategy`] - The [`strategy::ParserStrategy`] trait and the built-in strategies
//! - [`normalizer::Normalizer`] - Canonical and device field name mapping
//! - [`convert::TypeConverter`] - Converts field text into typed values
//! - [`error::ParseError`] - Error type with diagnostic context

pub mod config;
pub mod convert;
pub mod error;
pub mod mappings;
pub mod normalizer;
pub mod service;
pub mod strategy;
pub mod tokenizer;
pub mod types;

pub use config::ParserConfig;
pub use convert::TypeConverter;
pub use error::{ErrorCode, ParseError};
pub use normalizer::Normalizer;
pub use service::ParserService;
pub use strategy::{CancelToken, ParserStrategy};
pub use types::{
    CommandType, FieldType, OutputFormat, ParseHints, ParseResult, Resource, RouterOsVersion,
    Value,
};
