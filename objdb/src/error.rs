#![allow(unknown_lints)]
#![allow(missing_docs)]

use rmp_serde;
use rocksdb;

error_chain! {
	foreign_links {
		Kv(rocksdb::Error);
		Encode(rmp_serde::encode::Error);
		Decode(rmp_serde::decode::Error);
	}

	errors {
		Closed {
			description("Store is closed")
			display("Store is closed")
		}
		NotFound {
			description("Record not found")
			display("Record not found")
		}
		TableNotFound(name: String) {
			description("Table has not been maintained")
			display("Table not found: {}", name)
		}
		IndexNotFound(field: String) {
			description("Field is not part of the table's index set")
			display("Index not found: {}", field)
		}
		InvalidGuid(text: String) {
			description("Malformed guid text form")
			display("Invalid guid: {}", text)
		}
		InvalidTable(segment: String, error: String) {
			description("Table declares an unusable name or field")
			display("Invalid table segment `{}`: {}", segment, error)
		}
	}
}

impl PartialEq for ErrorKind {
	fn eq(&self, other: &Self) -> bool {
		use self::ErrorKind::*;

		match (self, other) {
			(&Closed, &Closed) => true,
			(&NotFound, &NotFound) => true,
			(&TableNotFound(ref name), &TableNotFound(ref name2))
				if name == name2 => true,
			(&IndexNotFound(ref field), &IndexNotFound(ref field2))
				if field == field2 => true,
			(&InvalidGuid(ref text), &InvalidGuid(ref text2))
				if text == text2 => true,
			(&InvalidTable(ref segment, ref error), &InvalidTable(ref segment2, ref error2))
				if segment == segment2 && error == error2 => true,
			_ => false,
		}
	}
}
