//! The store facade: lifecycle, lock discipline and operation routing.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use rocksdb::{self, WriteBatch, WriteOptions, DB};

use codec;
use error::{Error, ErrorKind, Result};
use find::{self, Window};
use guid::Guid;
use key::{self, KeySpace};
use maintain;
use object::{Object, Search};
use table::{Inline, TableDef};

/// Store configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
	/// Store-global key prefix; lets several stores multiplex one engine.
	pub prefix: Vec<u8>,
	/// Create the database files when missing (`Database::open` only).
	pub create_if_missing: bool,
}

impl Default for Options {
	fn default() -> Self {
		Options {
			prefix: Vec::new(),
			create_if_missing: true,
		}
	}
}

/// A top-level object store API.
///
/// Threadsafe: a single reader-writer lock serializes `maintain`, `put`,
/// `del` and `close` against each other and against the readers `get`,
/// `has` and `find`, which may run in parallel. Every mutating operation
/// lands in one synchronously committed batch, so the data record and its
/// index entries can never diverge.
pub struct Database {
	inner: RwLock<Inner>,
}

struct Inner {
	db: Option<DB>,
	keys: KeySpace,
	tables: HashMap<String, Inline>,
}

impl Inner {
	fn db(&self) -> Result<&DB> {
		self.db.as_ref().ok_or_else(|| Error::from(ErrorKind::Closed))
	}

	fn table(&self, name: &str) -> Result<&Inline> {
		self.tables
			.get(name)
			.ok_or_else(|| Error::from(ErrorKind::TableNotFound(name.into())))
	}
}

impl Database {
	/// Opens (or creates) a store at the given location.
	pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Database> {
		let mut opts = rocksdb::Options::default();
		opts.create_if_missing(options.create_if_missing);
		let db = DB::open(&opts, path.as_ref())?;
		debug!("opened object store at {}", path.as_ref().display());
		Database::with_db(db, options)
	}

	/// Adopts an already opened engine.
	pub fn with_db(db: DB, options: Options) -> Result<Database> {
		Ok(Database {
			inner: RwLock::new(Inner {
				db: Some(db),
				keys: KeySpace::new(&options.prefix),
				tables: HashMap::new(),
			}),
		})
	}

	/// Reconciles the table's persisted index set with the one the object
	/// declares, rebuilding secondary indexes over existing records, and
	/// (re)captures the object's factory for every later decode.
	///
	/// A table is unknown to every other operation until its first
	/// successful `maintain`. Re-running with an unchanged index set only
	/// rewrites the descriptor.
	pub fn maintain(&self, obj: &dyn Object) -> Result<()> {
		let mut inner = self.inner.write();
		inner.db()?;
		let def = check_table(obj)?;
		let tin = {
			let db = inner.db()?;
			let keys = &inner.keys;
			let tbl_key = keys.tbl(&def.name);
			let old = match get_raw(db, &tbl_key)? {
				Some(bytes) => codec::decode::<TableDef>(&bytes)?.index,
				None => Vec::new(),
			};
			let tin = Inline::new(def, obj.table_new());
			let (add, del) = tin.def.diff_index(&old);
			let mut batch = WriteBatch::default();
			if !add.is_empty() || !del.is_empty() {
				debug!(
					"maintaining table {}: adding {:?}, dropping {:?}",
					tin.def.name, add, del
				);
				maintain::rebuild(db, keys, &tin, &add, &del, &mut batch)?;
			}
			batch.put(&tbl_key, codec::encode(&tin.def)?);
			commit(db, batch)?;
			tin
		};
		inner.tables.insert(tin.def.name.clone(), tin);
		Ok(())
	}

	/// Persists the object and refreshes every index entry for its id in
	/// one atomic batch, returning the object's own id.
	///
	/// Overwriting an existing id first drops the index entries derived
	/// from the stored value, so no stale entry survives.
	pub fn put(&self, obj: &dyn Object) -> Result<Guid> {
		let inner = self.inner.write();
		let db = inner.db()?;
		let tin = inner.table(obj.table_name())?;
		let keys = &inner.keys;
		let id = obj.table_id();
		let encoded = obj.encode()?;
		let dat_key = keys.dat(&tin.def.name, &id);
		let mut batch = WriteBatch::default();
		batch.delete(&dat_key);
		if let Some(bytes) = get_raw(db, &dat_key)? {
			let mut old = tin.new_object();
			old.decode(&bytes)?;
			for field in &tin.def.index {
				batch.delete(keys.idx(&tin.def.name, field, &old.table_field(field), &id));
			}
		}
		batch.put(&dat_key, &encoded);
		for field in &tin.def.index {
			batch.put(
				keys.idx(&tin.def.name, field, &obj.table_field(field), &id),
				id.bytes(),
			);
		}
		commit(db, batch)?;
		Ok(id)
	}

	/// Loads the record stored under `id` into the caller's object.
	pub fn get(&self, obj: &mut dyn Object, id: Guid) -> Result<()> {
		let inner = self.inner.read();
		let db = inner.db()?;
		let tin = inner.table(obj.table_name())?;
		let bytes = get_raw(db, &inner.keys.dat(&tin.def.name, &id))?
			.ok_or_else(|| Error::from(ErrorKind::NotFound))?;
		obj.decode(&bytes)
	}

	/// Removes the record and every index entry derived from its stored
	/// value in one atomic batch. Succeeds when the id is already gone.
	pub fn del(&self, obj: &dyn Object, id: Guid) -> Result<()> {
		let inner = self.inner.write();
		let db = inner.db()?;
		let tin = inner.table(obj.table_name())?;
		let keys = &inner.keys;
		let dat_key = keys.dat(&tin.def.name, &id);
		let bytes = match get_raw(db, &dat_key)? {
			Some(bytes) => bytes,
			None => return Ok(()),
		};
		let mut old = tin.new_object();
		old.decode(&bytes)?;
		let mut batch = WriteBatch::default();
		batch.delete(&dat_key);
		for field in &tin.def.index {
			batch.delete(keys.idx(&tin.def.name, field, &old.table_field(field), &id));
		}
		commit(db, batch)
	}

	/// Existence check. With no fields: whether the table holds any record
	/// at all. With fields: whether some declared field's index records
	/// the object's current value for it, short-circuiting on the first
	/// hit; an undeclared field fails with `IndexNotFound`.
	pub fn has(&self, obj: &dyn Object, index: &[&str]) -> Result<bool> {
		let inner = self.inner.read();
		let db = inner.db()?;
		let tin = inner.table(obj.table_name())?;
		let keys = &inner.keys;
		if index.is_empty() {
			let (lo, hi) = keys.dat_range(&tin.def.name);
			let prefix_len = lo.len();
			return find::probe(&mut find::bounded_iter(db, lo, hi), prefix_len);
		}
		for field in index {
			if !tin.declares(field) {
				bail!(ErrorKind::IndexNotFound((*field).into()));
			}
		}
		for field in index {
			let (lo, hi) =
				keys.idx_value_range(&tin.def.name, field, &obj.table_field(field));
			let prefix_len = lo.len();
			if find::probe(&mut find::bounded_iter(db, lo, hi), prefix_len)? {
				return Ok(true);
			}
		}
		Ok(false)
	}

	/// Range scan returning matching ids.
	///
	/// Index-qualified searches run one pass per field and keep the
	/// intersection; otherwise a single pass covers the data namespace,
	/// bracketed by the time window. All passes observe one snapshot.
	/// Results are sorted by id (descending when `desc`) before `limit`
	/// applies.
	pub fn find(&self, obj: &dyn Object, search: &Search) -> Result<Vec<Guid>> {
		let inner = self.inner.read();
		let db = inner.db()?;
		let tin = inner.table(obj.table_name())?;
		let keys = &inner.keys;
		for field in &search.index {
			if !tin.declares(field) {
				bail!(ErrorKind::IndexNotFound(field.clone()));
			}
		}
		let window = Window {
			lo: search.unix_l,
			hi: search.unix_u,
		};
		let filter = search.filter.as_ref();
		let snapshot = db.snapshot();
		let mut all = if search.index.is_empty() {
			let (lo, hi) =
				keys.dat_range_between(&tin.def.name, search.unix_l, search.unix_u);
			let mut iter = find::snapshot_iter(&snapshot, lo, hi);
			find::dat_ids(
				&mut iter,
				keys.dat_scan_len(&tin.def.name),
				search.desc,
				search.limit,
				filter,
			)?
		} else {
			let mut all: Option<Vec<Guid>> = None;
			for field in &search.index {
				let (lo, hi) = keys.idx_range(&tin.def.name, field);
				let prefix_len = lo.len();
				let mut iter = find::snapshot_iter(&snapshot, lo, hi);
				let pass =
					find::idx_ids(&mut iter, prefix_len, field, search.desc, window, filter)?;
				all = Some(match all {
					None => pass,
					Some(prev) => find::intersect(prev, pass),
				});
				if all.as_ref().map_or(false, |ids| ids.is_empty()) {
					break;
				}
			}
			all.unwrap_or_else(Vec::new)
		};
		if search.desc {
			all.sort_by(|a, b| b.cmp(a));
		} else {
			all.sort();
		}
		if search.limit > 0 && all.len() > search.limit {
			all.truncate(search.limit);
		}
		Ok(all)
	}

	/// Closes the store. Every later operation, this one included, fails
	/// with `Closed`.
	pub fn close(&self) -> Result<()> {
		let mut inner = self.inner.write();
		match inner.db.take() {
			Some(db) => {
				drop(db);
				debug!("closed object store");
				Ok(())
			}
			None => Err(ErrorKind::Closed.into()),
		}
	}
}

fn check_table(obj: &dyn Object) -> Result<TableDef> {
	let name = obj.table_name().to_string();
	check_segment(&name)?;
	let index = obj.table_index();
	for field in &index {
		check_segment(field)?;
	}
	Ok(TableDef {
		name: name,
		index: index,
	})
}

fn check_segment(segment: &str) -> Result<()> {
	if segment.is_empty() || segment.len() > 0xff {
		bail!(ErrorKind::InvalidTable(
			segment.into(),
			"must be 1-255 bytes".into()
		));
	}
	if segment.bytes().any(|b| b == key::SEP || b == key::LMT) {
		bail!(ErrorKind::InvalidTable(
			segment.into(),
			"must not contain `-` or `.`".into()
		));
	}
	Ok(())
}

fn get_raw(db: &DB, key: &[u8]) -> Result<Option<Vec<u8>>> {
	match db.get_pinned(key)? {
		Some(value) => Ok(Some(value.to_vec())),
		None => Ok(None),
	}
}

fn commit(db: &DB, batch: WriteBatch) -> Result<()> {
	trace!("sync committing a batch of {} operations", batch.len());
	let mut opts = WriteOptions::default();
	opts.set_sync(true);
	db.write_opt(batch, &opts)?;
	Ok(())
}
