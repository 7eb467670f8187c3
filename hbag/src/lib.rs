//! A thread-safe multiset.
//!
//! ```
//! use hbag::Bag;
//!
//! let bag = Bag::new();
//! assert_eq!(0, bag.insert("apple"));
//! assert_eq!(1, bag.insert_many("apple", 2));
//! assert_eq!(Some(3), bag.contains("apple"));
//! assert_eq!(3, bag.remove("apple"));
//! assert_eq!((2, 1), (bag.len(), bag.uniq_len()));
//! ```
mod bag;
mod config;
mod counts;
mod error;

pub use crate::config::BagConfig;
pub use bag::*;
pub use error::*;
