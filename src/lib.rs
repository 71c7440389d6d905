//! Duck Search: a small web front-end for DuckDuckGo
//!
//! A search is described by a [`QueryDescriptor`], executed through a
//! [`SearchGateway`], normalized into a typed [`ResultTable`] and kept in
//! the user's [`Session`], where it can be filtered and exported to CSV or
//! Excel.

pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod gateway;
pub mod network;
pub mod query;
pub mod results;
pub mod search;
pub mod session;
pub mod web;

pub use config::Settings;
pub use error::{Result, SearchError};
pub use export::{ExportFormat, ExportedFile};
pub use filter::FilterSpec;
pub use gateway::{DuckDuckGo, RawRecord, SearchGateway};
pub use query::{build_query, QueryDescriptor, QueryParams, ResultKind};
pub use results::{ResultRecord, ResultTable};
pub use search::Search;
pub use session::{Session, SessionState, SessionStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
