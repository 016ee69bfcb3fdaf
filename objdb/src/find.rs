//! Scan internals: candidate collection over bounded engine iterators.

use std::collections::HashSet;

use rocksdb::{DBRawIterator, ReadOptions, Snapshot, DB};

use error::Result;
use guid::{self, Guid};
use key;
use object::Filter;

/// A raw iterator over `[lo, hi)`.
pub fn bounded_iter<'a>(db: &'a DB, lo: Vec<u8>, hi: Vec<u8>) -> DBRawIterator<'a> {
	db.raw_iterator_opt(bounds(lo, hi))
}

/// A raw iterator over `[lo, hi)` pinned to a snapshot, so several passes
/// observe one point in time.
pub fn snapshot_iter<'a>(snapshot: &'a Snapshot<'a>, lo: Vec<u8>, hi: Vec<u8>) -> DBRawIterator<'a> {
	snapshot.raw_iterator_opt(bounds(lo, hi))
}

fn bounds(lo: Vec<u8>, hi: Vec<u8>) -> ReadOptions {
	let mut opts = ReadOptions::default();
	opts.set_iterate_lower_bound(lo);
	opts.set_iterate_upper_bound(hi);
	opts
}

/// Inclusive window of creation seconds; a zero bound is unbounded.
#[derive(Debug, Clone, Copy)]
pub struct Window {
	/// Lower bound.
	pub lo: u32,
	/// Upper bound.
	pub hi: u32,
}

impl Window {
	/// Whether the id's embedded creation second falls in the window.
	pub fn contains(&self, id: &Guid) -> bool {
		let unix = id.unix();
		(self.lo == 0 || unix >= self.lo) && (self.hi == 0 || unix <= self.hi)
	}
}

/// Collects ids from a data-namespace scan.
///
/// A data key is exactly the bound prefix plus the id, and iteration
/// order equals the final id order in both directions, so the scan may
/// stop as soon as `limit` candidates got accepted.
pub fn dat_ids(
	iter: &mut DBRawIterator,
	prefix_len: usize,
	desc: bool,
	limit: usize,
	filter: Option<&Filter>,
) -> Result<Vec<Guid>> {
	let mut all = Vec::new();
	seek(iter, desc);
	while iter.valid() && (limit == 0 || all.len() < limit) {
		if let Some(id) = iter.key().filter(|k| k.len() == prefix_len + guid::LEN).and_then(key::parse_id) {
			if filter.map_or(true, |accept| accept(&id, "", &[])) {
				all.push(id);
			}
		}
		step(iter, desc);
	}
	iter.status()?;
	Ok(all)
}

/// Collects ids from one index field's pass.
///
/// Iteration order is value order, not id order, so every entry is
/// visited; the caller sorts and limits after intersecting passes.
/// Entries outside the window are skipped before the filter runs.
pub fn idx_ids(
	iter: &mut DBRawIterator,
	prefix_len: usize,
	field: &str,
	desc: bool,
	window: Window,
	filter: Option<&Filter>,
) -> Result<Vec<Guid>> {
	let mut all = Vec::new();
	seek(iter, desc);
	while iter.valid() {
		if let Some(k) = iter.key() {
			if let Some(value) = key::index_value(k, prefix_len) {
				let id = key::parse_id(k).expect("index_value verified the id tail; qed");
				if window.contains(&id) && filter.map_or(true, |accept| accept(&id, field, value)) {
					all.push(id);
				}
			}
		}
		step(iter, desc);
	}
	iter.status()?;
	Ok(all)
}

/// True once the range holds a key that is exactly the bound prefix plus
/// an id tail. Longer keys are entries of other values sharing the byte
/// prefix and do not count.
pub fn probe(iter: &mut DBRawIterator, prefix_len: usize) -> Result<bool> {
	iter.seek_to_first();
	while iter.valid() {
		if let Some(k) = iter.key() {
			if k.len() == prefix_len + guid::LEN {
				return Ok(true);
			}
		}
		iter.next();
	}
	iter.status()?;
	Ok(false)
}

/// Survivors of `next` already present in `prev`.
pub fn intersect(prev: Vec<Guid>, next: Vec<Guid>) -> Vec<Guid> {
	let seen: HashSet<Guid> = prev.into_iter().collect();
	next.into_iter().filter(|id| seen.contains(id)).collect()
}

fn seek(iter: &mut DBRawIterator, desc: bool) {
	if desc {
		iter.seek_to_last();
	} else {
		iter.seek_to_first();
	}
}

fn step(iter: &mut DBRawIterator, desc: bool) {
	if desc {
		iter.prev();
	} else {
		iter.next();
	}
}
