//! Declarative request validation.
//!
//! A [`Schema`] describes the expected `body`, `params` and `query` of a
//! request. [`Schema::check`] either returns the normalised sections (unknown
//! fields dropped, defaults filled in) or the first failure message. The
//! [`Validated`] extractor runs a schema before the handler body executes.

mod extract;
mod schema;

pub use extract::{RequestSchema, Validated};
pub use schema::{Field, Kind, Rule, Schema, Sections, Shape};
