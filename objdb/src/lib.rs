//! Embedded object store with secondary indexes on top of RocksDB.
//!
//! Assumptions:
//!
//! - objects declare a table name, a 12-byte time-embedded id and a list
//!   of indexed fields
//!
//! - the data record and one index entry per declared field are kept
//!   coherent through single, synchronously committed batches
//!
//! - indexes are rebuilt online when the declared set changes, against a
//!   consistent snapshot of existing records
//!
//! - range scans derive ordering, existence and time-window semantics
//!   from the id embedded in every key's tail
//!
//! All keys live in three namespaces built from `-`-joined segments under
//! an optional store-global prefix:
//!
//! ```text
//!  descriptor     data record        index entry
//!   /              /                  /
//! |tbl-LL-name|  |dat-LL-name-id|  |idx-LL-name-FF-field-value-id|
//! ```
//!
//! `LL` and `FF` are two-hex-char lengths of the segment that follows.
//! The id is always the trailing 12 bytes of a data or index key, so
//! readers peel it off the suffix. Exclusive range upper bounds swap the
//! trailing separator for `.`, the next byte up.

#![warn(missing_docs)]

extern crate byteorder;
#[macro_use]
extern crate error_chain;
extern crate hex_slice;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate parking_lot;
extern crate rand;
extern crate rmp_serde;
extern crate rocksdb;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[cfg(test)]
#[macro_use]
extern crate matches;
#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod codec;
pub mod guid;
pub mod key;

mod database;
mod error;
mod find;
mod maintain;
mod object;
mod table;

pub use database::{Database, Options};
pub use error::{Error, ErrorKind, Result};
pub use guid::Guid;
pub use object::{Filter, Object, Search};
pub use table::TableDef;
