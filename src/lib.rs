//! Conversion core for XLIFF localization workflows: JSON extraction with
//! skeletons, XLIFF 2.x downgrade, skeleton backfill (JSON, XML, DITA) and
//! multi-file join.

pub mod error;
pub mod logging;
pub mod model;
pub mod parsers;
pub mod protocol;
pub mod services;
pub mod xml;

pub use error::{ConvertError, Result};
