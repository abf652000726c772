#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![deny(unreachable_pub, private_in_public)]

//! maxregel
//!
//! An embeddable rule engine over partitioned fact sets. Rules are
//! composable transformations of a [`fact_set::FactSet`]; they can be run
//! forward to a fixpoint with [`inference::infer`] or backward, goal first,
//! with [`assignment::resolve`].
//!
//! ```
//! use maxregel::{
//!     config::InferenceConfig,
//!     fact_set::FactSet,
//!     inference::infer,
//!     rule::build::{filter_part, let_},
//!     term,
//!     tracer::NoTracer,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let people = FactSet::from_terms(
//!     "people",
//!     [term! {"name" => "Abe", "age" => 70}, term! {"name" => "Bart", "age" => 10}],
//! );
//! let rules = [let_("elders", filter_part("people", "age", ">", 40)?)];
//!
//! let derived = infer(&people, &rules, NoTracer, InferenceConfig::default())?;
//!
//! assert_eq!(derived.get("elders").size(), 1);
//! # Ok(())
//! # }
//! ```

pub mod assignment;
pub mod ast;
pub mod codec;
pub mod config;
pub mod error;
pub mod fact;
pub mod fact_set;
pub mod inference;
pub mod predicate;
pub mod pretty;
pub mod rule;
pub mod session;
pub mod store;
pub mod term;
pub mod tracer;
pub mod value;

/// Test utilities.
#[cfg(any(test, feature = "test_utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test_utils")))]
pub mod test_utils;
