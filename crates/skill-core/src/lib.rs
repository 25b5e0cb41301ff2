pub mod bundle;
pub mod classify;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod reference;
pub mod types;

pub use config::ResolverConfig;
pub use error::ResolveError;
pub use types::*;
