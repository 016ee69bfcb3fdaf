//! Composite keys over the engine's flat byte namespace.
//!
//! Three namespaces, told apart by a tag segment:
//!
//! ```text
//!  descriptor     data record        index entry
//!   /              /                  /
//! |tbl-LL-name|  |dat-LL-name-id|  |idx-LL-name-FF-field-value-id|
//! ```
//!
//! Segments are joined by `-` and optionally led by a store-global prefix.
//! `LL`/`FF` are the byte length of the following name or field segment as
//! two lowercase hex characters, which keeps names sharing a textual
//! prefix in disjoint ranges. Names and fields must stay free of the two
//! reserved bytes; index values may hold anything because the id tail has
//! a fixed length and the parser peels it off the end.
//!
//! Range bounds derive from prefix forms: the prefix plus `-` is the
//! inclusive lower bound, the prefix plus `.` (the next byte up) the
//! exclusive upper one, so `[P-, P.)` covers exactly the keys below `P`.

use guid::{self, Guid};

/// Segment separator.
pub const SEP: u8 = 0x2d;

/// Exclusive upper-bound byte, ordering immediately after `SEP`.
pub const LMT: u8 = 0x2e;

const TAG_TBL: &'static [u8] = b"tbl";
const TAG_DAT: &'static [u8] = b"dat";
const TAG_IDX: &'static [u8] = b"idx";

const HEX: &'static [u8; 16] = b"0123456789abcdef";

/// Builder for one store's slice of the key namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySpace {
	prefix: Vec<u8>,
}

impl KeySpace {
	/// A keyspace under the given store-global prefix (may be empty).
	pub fn new(prefix: &[u8]) -> KeySpace {
		KeySpace {
			prefix: prefix.to_vec(),
		}
	}

	/// Table descriptor key.
	pub fn tbl(&self, name: &str) -> Vec<u8> {
		let mut buf = self.buf(7 + name.len());
		segment(&mut buf, TAG_TBL);
		sized_segment(&mut buf, name.as_bytes());
		buf
	}

	/// Data record key.
	pub fn dat(&self, name: &str, id: &Guid) -> Vec<u8> {
		let mut buf = self.dat_prefix(name);
		buf.push(SEP);
		buf.extend_from_slice(id.bytes());
		buf
	}

	/// `[P-, P.)` bracketing every data record of a table.
	pub fn dat_range(&self, name: &str) -> (Vec<u8>, Vec<u8>) {
		bounds(self.dat_prefix(name))
	}

	/// Data range narrowed to an inclusive window of creation seconds.
	///
	/// Ids are time-prefixed, so a synthetic all-zeros id at `unix_l` and
	/// an all-ones id at `unix_u` bracket the window; the upper bound gets
	/// a trailing zero byte to stay inclusive under the engine's exclusive
	/// bound. A zero second falls back to the plain range sentinel.
	pub fn dat_range_between(&self, name: &str, unix_l: u32, unix_u: u32) -> (Vec<u8>, Vec<u8>) {
		let prefix = self.dat_prefix(name);
		let mut lo = prefix.clone();
		lo.push(SEP);
		if unix_l > 0 {
			lo.extend_from_slice(Guid::min_at(unix_l).bytes());
		}
		let mut hi = prefix;
		if unix_u > 0 {
			hi.push(SEP);
			hi.extend_from_slice(Guid::max_at(unix_u).bytes());
			hi.push(0x00);
		} else {
			hi.push(LMT);
		}
		(lo, hi)
	}

	/// Length of a data bound prefix; a data key is exactly this plus the id.
	pub fn dat_scan_len(&self, name: &str) -> usize {
		self.dat_prefix(name).len() + 1
	}

	/// Index entry key.
	pub fn idx(&self, name: &str, field: &str, value: &[u8], id: &Guid) -> Vec<u8> {
		let mut buf = self.idx_prefix(name, field);
		buf.push(SEP);
		buf.extend_from_slice(value);
		buf.push(SEP);
		buf.extend_from_slice(id.bytes());
		buf
	}

	/// `[P-, P.)` bracketing every entry of one field's index.
	pub fn idx_range(&self, name: &str, field: &str) -> (Vec<u8>, Vec<u8>) {
		bounds(self.idx_prefix(name, field))
	}

	/// `[P-, P.)` bracketing the entries recording exactly `value`.
	pub fn idx_value_range(&self, name: &str, field: &str, value: &[u8]) -> (Vec<u8>, Vec<u8>) {
		let mut prefix = self.idx_prefix(name, field);
		prefix.push(SEP);
		prefix.extend_from_slice(value);
		bounds(prefix)
	}

	fn dat_prefix(&self, name: &str) -> Vec<u8> {
		let mut buf = self.buf(7 + name.len());
		segment(&mut buf, TAG_DAT);
		sized_segment(&mut buf, name.as_bytes());
		buf
	}

	fn idx_prefix(&self, name: &str, field: &str) -> Vec<u8> {
		let mut buf = self.buf(11 + name.len() + field.len());
		segment(&mut buf, TAG_IDX);
		sized_segment(&mut buf, name.as_bytes());
		sized_segment(&mut buf, field.as_bytes());
		buf
	}

	fn buf(&self, cap: usize) -> Vec<u8> {
		let mut buf = Vec::with_capacity(self.prefix.len() + 1 + cap + 1 + guid::LEN);
		buf.extend_from_slice(&self.prefix);
		buf
	}
}

/// Recovers the id tail of a well-formed `DAT` or `IDX` key.
pub fn parse_id(key: &[u8]) -> Option<Guid> {
	if key.len() < guid::LEN {
		return None;
	}
	Guid::from_slice(&key[key.len() - guid::LEN..])
}

/// Slices the value out of an `IDX` key scanned under a bound prefix of
/// `prefix_len` bytes: everything between the prefix and the fixed-length
/// id tail. `None` when the key cannot carry such a tail.
pub fn index_value(key: &[u8], prefix_len: usize) -> Option<&[u8]> {
	let tail = guid::LEN + 1;
	if key.len() < prefix_len + tail || key[key.len() - tail] != SEP {
		return None;
	}
	Some(&key[prefix_len..key.len() - tail])
}

fn segment(buf: &mut Vec<u8>, seg: &[u8]) {
	if !buf.is_empty() {
		buf.push(SEP);
	}
	buf.extend_from_slice(seg);
}

fn sized_segment(buf: &mut Vec<u8>, seg: &[u8]) {
	debug_assert!(!seg.is_empty() && seg.len() <= 0xff);
	let len = seg.len();
	segment(buf, &[HEX[len >> 4], HEX[len & 0x0f]]);
	segment(buf, seg);
}

fn bounds(prefix: Vec<u8>) -> (Vec<u8>, Vec<u8>) {
	let mut lo = prefix.clone();
	lo.push(SEP);
	let mut hi = prefix;
	hi.push(LMT);
	(lo, hi)
}
