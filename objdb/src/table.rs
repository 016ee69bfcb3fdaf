//! Table descriptors and the in-memory registry entry.

use object::Object;

/// Persisted descriptor of a table: its name and the last committed
/// index set. Stored under the `TBL` namespace via the structured codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
	/// Table name.
	#[serde(rename = "n")]
	pub name: String,
	/// Committed index fields, in declaration order.
	#[serde(rename = "i")]
	pub index: Vec<String>,
}

impl TableDef {
	/// Ordered set differences against a previously committed index set:
	/// `(add, drop)`.
	pub fn diff_index(&self, old: &[String]) -> (Vec<String>, Vec<String>) {
		let add = self
			.index
			.iter()
			.filter(|field| !old.contains(field))
			.cloned()
			.collect();
		let drop = old
			.iter()
			.filter(|field| !self.index.contains(field))
			.cloned()
			.collect();
		(add, drop)
	}
}

/// Registry entry: the committed descriptor plus the factory prototype
/// captured at maintenance time.
pub struct Inline {
	/// The committed descriptor.
	pub def: TableDef,
	proto: Box<dyn Object>,
}

impl Inline {
	/// Pairs a descriptor with its factory prototype.
	pub fn new(def: TableDef, proto: Box<dyn Object>) -> Inline {
		Inline {
			def: def,
			proto: proto,
		}
	}

	/// A fresh zero-valued instance from the captured factory.
	pub fn new_object(&self) -> Box<dyn Object> {
		self.proto.table_new()
	}

	/// True iff `field` is part of the committed index set.
	pub fn declares(&self, field: &str) -> bool {
		self.def.index.iter().any(|f| f == field)
	}
}
