//! The contract an application entity exposes to the store.

use error::Result;
use guid::Guid;

/// A storable application object.
///
/// The store never inspects an object's fields directly; everything it
/// needs flows through this trait. `table_new` stands in for runtime
/// reflection: the instance handed to `Database::maintain` doubles as the
/// factory for every later decode on its table. `encode`/`decode` are the
/// object's binary self-serialization; implementations usually delegate
/// to the `codec` module.
pub trait Object: Send + Sync {
	/// Table this object belongs to. 1-255 bytes, free of `-` and `.`.
	fn table_name(&self) -> &str;

	/// The object's identifier.
	fn table_id(&self) -> Guid;

	/// Declared index fields, in declaration order. Each 1-255 bytes,
	/// free of `-` and `.`.
	fn table_index(&self) -> Vec<String>;

	/// The raw bytes the index records for `field`; may be anything.
	fn table_field(&self, field: &str) -> Vec<u8>;

	/// A zero-valued instance for the codec to populate.
	fn table_new(&self) -> Box<dyn Object>;

	/// The object's binary form.
	fn encode(&self) -> Result<Vec<u8>>;

	/// Rehydrates the object from its binary form.
	fn decode(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Candidate predicate for `Database::find`: the candidate's id, the index
/// field under scan and the entry's raw value bytes. Data-namespace scans
/// pass an empty field and value.
pub type Filter<'a> = Box<dyn Fn(&Guid, &str, &[u8]) -> bool + 'a>;

/// Range-scan parameters for `Database::find`.
pub struct Search<'a> {
	/// Maximum ids to return, applied after sorting; `0` means unlimited.
	pub limit: usize,
	/// Iterate and sort descending by id.
	pub desc: bool,
	/// Index fields to scan; a candidate must survive every field's pass.
	/// When empty the scan runs over the data namespace instead.
	pub index: Vec<String>,
	/// Candidate predicate; `None` accepts everything.
	pub filter: Option<Filter<'a>>,
	/// Inclusive lower bound on creation seconds; `0` means unbounded.
	pub unix_l: u32,
	/// Inclusive upper bound on creation seconds; `0` means unbounded.
	pub unix_u: u32,
}

impl<'a> Default for Search<'a> {
	fn default() -> Search<'a> {
		Search {
			limit: 0,
			desc: false,
			index: Vec::new(),
			filter: None,
			unix_l: 0,
			unix_u: 0,
		}
	}
}
