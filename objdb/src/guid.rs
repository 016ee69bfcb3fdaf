//! Time-embedded 12-byte identifiers.
//!
//! Layout, big-endian throughout:
//!
//! ```text
//!  seconds  mark  serial random
//!   /        /     /      /
//! |....|   |....| |..|   |..|
//! ```
//!
//! The leading four bytes hold the creation second, so byte-wise ordering
//! of guids follows wall-clock creation time. The text form is a
//! 20-character left-zero-padded base-36 rendering of the 96-bit value.

use std::process;
use std::str::FromStr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use hex_slice::AsHex;
use rand;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use error::{Error, ErrorKind, Result};

/// Length in bytes of a binary guid.
pub const LEN: usize = 12;

/// Length in characters of the text form.
pub const STR_LEN: usize = 20;

const ALPHABET: &'static [u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A 12-byte time-embedded unique identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid([u8; LEN]);

impl Guid {
	/// Wraps raw guid bytes.
	pub fn from_bytes(bytes: [u8; LEN]) -> Guid {
		Guid(bytes)
	}

	/// Reads a guid out of a 12-byte slice; `None` on any other length.
	pub fn from_slice(bytes: &[u8]) -> Option<Guid> {
		if bytes.len() != LEN {
			return None;
		}
		let mut b = [0u8; LEN];
		b.copy_from_slice(bytes);
		Some(Guid(b))
	}

	/// The raw guid bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.0
	}

	/// The embedded creation second.
	pub fn unix(&self) -> u32 {
		BigEndian::read_u32(&self.0[0..4])
	}

	/// True iff all twelve bytes are zero.
	pub fn is_empty(&self) -> bool {
		self.0.iter().all(|b| *b == 0)
	}

	/// The smallest guid carrying the given creation second.
	pub fn min_at(unix: u32) -> Guid {
		let mut b = [0u8; LEN];
		BigEndian::write_u32(&mut b[0..4], unix);
		Guid(b)
	}

	/// The largest guid carrying the given creation second.
	pub fn max_at(unix: u32) -> Guid {
		let mut b = [0xffu8; LEN];
		BigEndian::write_u32(&mut b[0..4], unix);
		Guid(b)
	}

	fn to_u128(&self) -> u128 {
		self.0.iter().fold(0u128, |n, b| (n << 8) | *b as u128)
	}
}

impl fmt::Display for Guid {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let mut out = [b'0'; STR_LEN];
		let mut n = self.to_u128();
		let mut i = STR_LEN;
		while n > 0 {
			i -= 1;
			out[i] = ALPHABET[(n % 36) as usize];
			n /= 36;
		}
		f.write_str(::std::str::from_utf8(&out).expect("alphabet is ascii; qed"))
	}
}

impl fmt::Debug for Guid {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Guid({:02x})", self.0.as_hex())
	}
}

impl FromStr for Guid {
	type Err = Error;

	fn from_str(s: &str) -> Result<Guid> {
		if s.len() != STR_LEN {
			bail!(ErrorKind::InvalidGuid(s.into()));
		}
		let mut n = 0u128;
		for c in s.bytes() {
			let digit = match c {
				b'0'..=b'9' => c - b'0',
				b'a'..=b'z' => c - b'a' + 10,
				_ => bail!(ErrorKind::InvalidGuid(s.into())),
			};
			n = n * 36 + digit as u128;
			if n >> 96 != 0 {
				bail!(ErrorKind::InvalidGuid(s.into()));
			}
		}
		let mut b = [0u8; LEN];
		for i in (0..LEN).rev() {
			b[i] = (n & 0xff) as u8;
			n >>= 8;
		}
		Ok(Guid(b))
	}
}

impl Serialize for Guid {
	fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
		serializer.serialize_bytes(&self.0)
	}
}

struct GuidVisitor;

impl<'de> Visitor<'de> for GuidVisitor {
	type Value = Guid;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} guid bytes", LEN)
	}

	fn visit_bytes<E: de::Error>(self, v: &[u8]) -> ::std::result::Result<Guid, E> {
		Guid::from_slice(v).ok_or_else(|| E::invalid_length(v.len(), &self))
	}

	fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> ::std::result::Result<Guid, A::Error> {
		let mut b = [0u8; LEN];
		for i in 0..LEN {
			b[i] = seq.next_element()?
				.ok_or_else(|| de::Error::invalid_length(i, &self))?;
		}
		Ok(Guid(b))
	}
}

impl<'de> Deserialize<'de> for Guid {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Guid, D::Error> {
		deserializer.deserialize_bytes(GuidVisitor)
	}
}

/// Mints guids stamped with a fixed 32-bit origin mark.
pub struct Generator {
	mark: u32,
	serial: AtomicU16,
}

impl Generator {
	/// Creates a generator with the given origin mark and a random
	/// starting serial.
	pub fn new(mark: u32) -> Generator {
		Generator {
			mark: mark,
			serial: AtomicU16::new(rand::random()),
		}
	}

	/// Mints a guid stamped with the current wall-clock second.
	pub fn next(&self) -> Guid {
		self.next_at(unix_now())
	}

	/// Mints a guid stamped with the given creation second.
	pub fn next_at(&self, unix: u32) -> Guid {
		let mut b = [0u8; LEN];
		BigEndian::write_u32(&mut b[0..4], unix);
		BigEndian::write_u32(&mut b[4..8], self.mark);
		BigEndian::write_u16(&mut b[8..10], self.serial.fetch_add(1, Ordering::Relaxed));
		BigEndian::write_u16(&mut b[10..12], rand::random());
		Guid(b)
	}
}

lazy_static! {
	static ref HOST: Generator = Generator::new(host_mark());
}

/// Mints a guid from the process-global generator.
pub fn new() -> Guid {
	HOST.next()
}

/// Mints a guid with the given creation second from the process-global
/// generator.
pub fn new_at(unix: u32) -> Guid {
	HOST.next_at(unix)
}

fn host_mark() -> u32 {
	let host: u16 = rand::random();
	(host as u32) << 16 | process::id() & 0xffff
}

fn unix_now() -> u32 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs() as u32)
		.unwrap_or(0)
}
