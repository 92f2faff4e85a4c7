//! # Filter Type Registry
//!
//! A fixed algebra describing, for every filter message family, which operators
//! are legal and how the filter value is constructed.
//!
//! ## Operator sets
//!
//! | Family | Operators |
//! |--------|-----------|
//! | Numeric | `eq ne lt lte gt gte in not_in` (+ range when `gte` and `lte` are both set) |
//! | String | `eq ne contains starts_with ends_with like not_like in not_in` |
//! | Bool | `eq ne` |
//! | Map | `has_key not_has_key has_any_key has_all_keys` |
//! | Nullable `X` | operators of `X` + `is_null is_not_null` |
//!
//! The operator set is a function of `(kind, nullable, map)` only. Individual
//! schema fields never override it.
//!
//! ## Usage
//!
//! The registry is an immutable value built once per run and passed by
//! reference to the flattener, the endpoint builder and the synthesizer:
//!
//! ```
//! use querygen::filters::{FilterRegistry, Operator};
//!
//! let registry = FilterRegistry::standard();
//! let uint32 = registry.get("UInt32Filter").unwrap();
//! assert!(registry.builds_range_for(uint32));
//! assert_eq!(registry.match_operator("not_in"), Some(Operator::NotIn));
//! ```

mod registry;

pub use registry::*;
