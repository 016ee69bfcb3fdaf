//! Online index rebuilds for a changed index set.

use rocksdb::{WriteBatch, DB};

use error::Result;
use find;
use key::KeySpace;
use table::Inline;

/// Applies an index-set change to every existing record of a table.
///
/// Scans the table's data range under a consistent snapshot, decodes each
/// record through the captured factory, and accumulates one index delete
/// per dropped field and one index set per added field into the caller's
/// batch. The caller commits the batch together with the new descriptor,
/// so a failure anywhere leaves no visible change.
pub fn rebuild(
	db: &DB,
	keys: &KeySpace,
	tin: &Inline,
	add: &[String],
	del: &[String],
	batch: &mut WriteBatch,
) -> Result<()> {
	let name = &tin.def.name;
	let (lo, hi) = keys.dat_range(name);
	let snapshot = db.snapshot();
	let mut iter = find::snapshot_iter(&snapshot, lo, hi);
	iter.seek_to_first();
	while iter.valid() {
		if let Some(bytes) = iter.value() {
			let mut obj = tin.new_object();
			obj.decode(bytes)?;
			let id = obj.table_id();
			for field in del {
				batch.delete(keys.idx(name, field, &obj.table_field(field), &id));
			}
			for field in add {
				batch.put(keys.idx(name, field, &obj.table_field(field), &id), id.bytes());
			}
		}
		iter.next();
	}
	iter.status()?;
	Ok(())
}
