#[macro_use]
extern crate matches;
extern crate objdb;
#[macro_use]
extern crate quickcheck;
extern crate rocksdb;
#[macro_use]
extern crate serde_derive;
extern crate tempdir;

use objdb::key::KeySpace;
use objdb::{codec, guid, Database, ErrorKind, Guid, Object, Options, Result, Search};
use tempdir::TempDir;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct User {
	#[serde(rename = "d")]
	id: Guid,
	#[serde(rename = "e")]
	email: String,
	#[serde(rename = "a")]
	age: String,
}

impl User {
	fn new(unix: u32, email: &str, age: &str) -> User {
		User {
			id: guid::new_at(unix),
			email: email.into(),
			age: age.into(),
		}
	}

	fn probe(email: &str, age: &str) -> User {
		User {
			id: Guid::default(),
			email: email.into(),
			age: age.into(),
		}
	}
}

impl Object for User {
	fn table_name(&self) -> &str {
		"u"
	}

	fn table_id(&self) -> Guid {
		self.id
	}

	fn table_index(&self) -> Vec<String> {
		vec!["email".into(), "age".into()]
	}

	fn table_field(&self, field: &str) -> Vec<u8> {
		match field {
			"email" => self.email.as_bytes().to_vec(),
			"age" => self.age.as_bytes().to_vec(),
			_ => Vec::new(),
		}
	}

	fn table_new(&self) -> Box<dyn Object> {
		Box::new(User::default())
	}

	fn encode(&self) -> Result<Vec<u8>> {
		codec::encode(self)
	}

	fn decode(&mut self, bytes: &[u8]) -> Result<()> {
		*self = codec::decode(bytes)?;
		Ok(())
	}
}

/// The same records and table, but with only `email` declared.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SlimUser(User);

impl Object for SlimUser {
	fn table_name(&self) -> &str {
		"u"
	}

	fn table_id(&self) -> Guid {
		self.0.id
	}

	fn table_index(&self) -> Vec<String> {
		vec!["email".into()]
	}

	fn table_field(&self, field: &str) -> Vec<u8> {
		self.0.table_field(field)
	}

	fn table_new(&self) -> Box<dyn Object> {
		Box::new(SlimUser::default())
	}

	fn encode(&self) -> Result<Vec<u8>> {
		codec::encode(self)
	}

	fn decode(&mut self, bytes: &[u8]) -> Result<()> {
		*self = codec::decode(bytes)?;
		Ok(())
	}
}

/// A table name carrying a reserved byte.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Dashed(User);

impl Object for Dashed {
	fn table_name(&self) -> &str {
		"bad-name"
	}

	fn table_id(&self) -> Guid {
		self.0.id
	}

	fn table_index(&self) -> Vec<String> {
		Vec::new()
	}

	fn table_field(&self, field: &str) -> Vec<u8> {
		self.0.table_field(field)
	}

	fn table_new(&self) -> Box<dyn Object> {
		Box::new(Dashed::default())
	}

	fn encode(&self) -> Result<Vec<u8>> {
		codec::encode(self)
	}

	fn decode(&mut self, bytes: &[u8]) -> Result<()> {
		*self = codec::decode(bytes)?;
		Ok(())
	}
}

fn open_db(temp: &TempDir) -> Database {
	let db = Database::open(temp.path(), Options::default()).unwrap();
	db.maintain(&User::default()).unwrap();
	db
}

fn find_field(db: &Database, field: &str, value: &str, limit: usize, desc: bool) -> Vec<Guid> {
	db.find(
		&User::default(),
		&Search {
			limit: limit,
			desc: desc,
			index: vec![field.into()],
			filter: Some(Box::new(move |_, _, v| v == value.as_bytes())),
			..Default::default()
		},
	)
	.unwrap()
}

fn find_email(db: &Database, value: &str, limit: usize, desc: bool) -> Vec<Guid> {
	find_field(db, "email", value, limit, desc)
}

#[test]
fn test_put_get_roundtrip() {
	let temp = TempDir::new("objdb_put_get").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	assert_eq!(db.put(&a).unwrap(), a.id);
	assert_eq!(db.put(&b).unwrap(), b.id);

	let mut got = User::default();
	db.get(&mut got, a.id).unwrap();
	assert_eq!(got, a);
	db.get(&mut got, b.id).unwrap();
	assert_eq!(got, b);
}

#[test]
fn test_get_missing_id() {
	let temp = TempDir::new("objdb_get_missing").unwrap();
	let db = open_db(&temp);
	let err = db.get(&mut User::default(), guid::new_at(1)).unwrap_err();
	assert_matches!(err.kind(), &ErrorKind::NotFound);
}

#[test]
fn test_has_by_index_value() {
	let temp = TempDir::new("objdb_has").unwrap();
	let db = open_db(&temp);
	db.put(&User::new(1000, "x@y", "030")).unwrap();
	db.put(&User::new(2000, "x@y", "040")).unwrap();

	assert!(db.has(&User::probe("x@y", ""), &["email"]).unwrap());
	assert!(!db.has(&User::probe("nope", ""), &["email"]).unwrap());
	assert!(db.has(&User::probe("", "040"), &["age"]).unwrap());
	// any declared field matching is enough
	assert!(db.has(&User::probe("nope", "030"), &["email", "age"]).unwrap());

	let err = db.has(&User::default(), &["city"]).unwrap_err();
	assert_matches!(err.kind(), &ErrorKind::IndexNotFound(_));
}

#[test]
fn test_find_by_index_order_and_limit() {
	let temp = TempDir::new("objdb_find").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	db.put(&a).unwrap();
	db.put(&b).unwrap();

	assert_eq!(find_email(&db, "x@y", 0, false), vec![a.id, b.id]);
	assert_eq!(find_email(&db, "x@y", 0, true), vec![b.id, a.id]);
	assert_eq!(find_email(&db, "x@y", 1, true), vec![b.id]);
	assert_eq!(find_email(&db, "zz", 0, false), vec![]);

	let err = db
		.find(
			&User::default(),
			&Search {
				index: vec!["city".into()],
				..Default::default()
			},
		)
		.unwrap_err();
	assert_matches!(err.kind(), &ErrorKind::IndexNotFound(_));
}

#[test]
fn test_find_time_window() {
	let temp = TempDir::new("objdb_window").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	db.put(&a).unwrap();
	db.put(&b).unwrap();

	let late = Search {
		unix_l: 1500,
		..Default::default()
	};
	assert_eq!(db.find(&User::default(), &late).unwrap(), vec![b.id]);

	let early = Search {
		unix_u: 1500,
		..Default::default()
	};
	assert_eq!(db.find(&User::default(), &early).unwrap(), vec![a.id]);

	// both bounds are inclusive
	let exact = Search {
		unix_l: 1000,
		unix_u: 2000,
		..Default::default()
	};
	assert_eq!(db.find(&User::default(), &exact).unwrap(), vec![a.id, b.id]);

	// the window narrows index passes as well
	let windowed = Search {
		index: vec!["email".into()],
		filter: Some(Box::new(|_, _, v| v == b"x@y")),
		unix_l: 1500,
		..Default::default()
	};
	assert_eq!(db.find(&User::default(), &windowed).unwrap(), vec![b.id]);
}

#[test]
fn test_find_data_scan_feeds_ids_only() {
	let temp = TempDir::new("objdb_data_scan").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	db.put(&a).unwrap();
	db.put(&b).unwrap();

	let wanted = a.id;
	let search = Search {
		filter: Some(Box::new(move |id, field, value| {
			assert_eq!(field, "");
			assert!(value.is_empty());
			*id == wanted
		})),
		..Default::default()
	};
	assert_eq!(db.find(&User::default(), &search).unwrap(), vec![a.id]);
}

#[test]
fn test_overwrite_leaves_no_stale_index() {
	let temp = TempDir::new("objdb_overwrite").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	db.put(&a).unwrap();
	db.put(&b).unwrap();

	let mut moved = a.clone();
	moved.email = "z@y".into();
	assert_eq!(db.put(&moved).unwrap(), a.id);

	assert_eq!(find_email(&db, "x@y", 0, false), vec![b.id]);
	assert_eq!(find_email(&db, "z@y", 0, false), vec![a.id]);

	let mut got = User::default();
	db.get(&mut got, a.id).unwrap();
	assert_eq!(got, moved);
}

#[test]
fn test_del_and_emptiness() {
	let temp = TempDir::new("objdb_del").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	db.put(&a).unwrap();
	db.put(&b).unwrap();

	assert!(db.has(&User::default(), &[]).unwrap());
	db.del(&User::default(), b.id).unwrap();
	assert!(db.has(&User::default(), &[]).unwrap());
	// no index entry of the deleted record survives
	assert!(!db.has(&User::probe("", "040"), &["age"]).unwrap());
	assert_eq!(find_email(&db, "x@y", 0, false), vec![a.id]);

	db.del(&User::default(), a.id).unwrap();
	assert!(!db.has(&User::default(), &[]).unwrap());

	// deleting a missing id succeeds
	db.del(&User::default(), a.id).unwrap();
}

#[test]
fn test_maintain_add_index_backfills() {
	let temp = TempDir::new("objdb_maintain_add").unwrap();
	let db = Database::open(temp.path(), Options::default()).unwrap();
	db.maintain(&SlimUser::default()).unwrap();
	let a = SlimUser(User::new(1000, "x@y", "030"));
	let b = SlimUser(User::new(2000, "x@y", "040"));
	db.put(&a).unwrap();
	db.put(&b).unwrap();

	let err = db
		.find(
			&User::default(),
			&Search {
				index: vec!["age".into()],
				..Default::default()
			},
		)
		.unwrap_err();
	assert_matches!(err.kind(), &ErrorKind::IndexNotFound(_));

	// declaring `age` rebuilds its index over the records already stored
	db.maintain(&User::default()).unwrap();
	assert_eq!(find_field(&db, "age", "030", 0, false), vec![a.0.id]);
	assert_eq!(find_field(&db, "age", "040", 0, false), vec![b.0.id]);
	assert!(db.has(&User::probe("", "040"), &["age"]).unwrap());
}

#[test]
fn test_maintain_drop_index_clears_entries() {
	let temp = TempDir::new("objdb_maintain_drop").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	db.put(&a).unwrap();
	db.put(&b).unwrap();

	db.maintain(&SlimUser::default()).unwrap();

	let err = db
		.find(
			&User::default(),
			&Search {
				index: vec!["age".into()],
				..Default::default()
			},
		)
		.unwrap_err();
	assert_matches!(err.kind(), &ErrorKind::IndexNotFound(_));
	// the surviving index still answers
	assert_eq!(find_email(&db, "x@y", 0, false), vec![a.id, b.id]);
	db.close().unwrap();

	// the dropped range is physically empty
	let raw = rocksdb::DB::open_default(temp.path()).unwrap();
	let (lo, hi) = KeySpace::new(b"").idx_range("u", "age");
	let mut opts = rocksdb::ReadOptions::default();
	opts.set_iterate_lower_bound(lo);
	opts.set_iterate_upper_bound(hi);
	let mut iter = raw.raw_iterator_opt(opts);
	iter.seek_to_first();
	assert!(!iter.valid());
}

#[test]
fn test_maintain_unchanged_set_keeps_everything() {
	let temp = TempDir::new("objdb_maintain_same").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	db.put(&a).unwrap();

	db.maintain(&User::default()).unwrap();

	let mut got = User::default();
	db.get(&mut got, a.id).unwrap();
	assert_eq!(got, a);
	assert_eq!(find_email(&db, "x@y", 0, false), vec![a.id]);
}

#[test]
fn test_maintain_rejects_reserved_bytes() {
	let temp = TempDir::new("objdb_maintain_bad").unwrap();
	let db = Database::open(temp.path(), Options::default()).unwrap();
	let err = db.maintain(&Dashed::default()).unwrap_err();
	assert_matches!(err.kind(), &ErrorKind::InvalidTable(..));
}

#[test]
fn test_multi_index_intersection() {
	let temp = TempDir::new("objdb_intersect").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "x@y", "030");
	let b = User::new(2000, "x@y", "040");
	let c = User::new(3000, "z@y", "030");
	db.put(&a).unwrap();
	db.put(&b).unwrap();
	db.put(&c).unwrap();

	let both = |limit, desc| {
		db.find(
			&User::default(),
			&Search {
				limit: limit,
				desc: desc,
				index: vec!["email".into(), "age".into()],
				filter: Some(Box::new(|_, field, value| match field {
					"email" => value == b"x@y",
					_ => value == b"030",
				})),
				..Default::default()
			},
		)
		.unwrap()
	};
	assert_eq!(both(0, false), vec![a.id]);

	let d = User::new(4000, "x@y", "030");
	db.put(&d).unwrap();
	assert_eq!(both(0, false), vec![a.id, d.id]);
	// the limit cuts after intersection and sort
	assert_eq!(both(1, true), vec![d.id]);
}

#[test]
fn test_empty_index_value() {
	let temp = TempDir::new("objdb_empty_value").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "", "030");
	db.put(&a).unwrap();

	assert!(db.has(&User::probe("", ""), &["email"]).unwrap());
	assert!(!db.has(&User::probe("x", ""), &["email"]).unwrap());
	assert_eq!(find_email(&db, "", 0, false), vec![a.id]);
}

#[test]
fn test_index_value_with_reserved_bytes() {
	let temp = TempDir::new("objdb_raw_value").unwrap();
	let db = open_db(&temp);
	let a = User::new(1000, "a-b.c", "030");
	db.put(&a).unwrap();

	assert!(db.has(&User::probe("a-b.c", ""), &["email"]).unwrap());
	// a value is never confused with one it textually extends
	assert!(!db.has(&User::probe("a", ""), &["email"]).unwrap());
	assert!(!db.has(&User::probe("a-b", ""), &["email"]).unwrap());
	assert_eq!(find_email(&db, "a-b.c", 0, false), vec![a.id]);
}

#[test]
fn test_closed_store_refuses_everything() {
	let temp = TempDir::new("objdb_closed").unwrap();
	let db = open_db(&temp);
	db.close().unwrap();

	assert_matches!(db.close().unwrap_err().kind(), &ErrorKind::Closed);
	assert_matches!(db.maintain(&User::default()).unwrap_err().kind(), &ErrorKind::Closed);
	assert_matches!(db.put(&User::default()).unwrap_err().kind(), &ErrorKind::Closed);
	assert_matches!(
		db.get(&mut User::default(), guid::new_at(1)).unwrap_err().kind(),
		&ErrorKind::Closed
	);
	assert_matches!(
		db.del(&User::default(), guid::new_at(1)).unwrap_err().kind(),
		&ErrorKind::Closed
	);
	assert_matches!(db.has(&User::default(), &[]).unwrap_err().kind(), &ErrorKind::Closed);
	assert_matches!(
		db.find(&User::default(), &Search::default()).unwrap_err().kind(),
		&ErrorKind::Closed
	);
}

#[test]
fn test_unmaintained_table_is_unknown() {
	let temp = TempDir::new("objdb_unknown_table").unwrap();
	let db = Database::open(temp.path(), Options::default()).unwrap();

	assert_matches!(
		db.put(&User::default()).unwrap_err().kind(),
		&ErrorKind::TableNotFound(_)
	);
	assert_matches!(
		db.get(&mut User::default(), guid::new_at(1)).unwrap_err().kind(),
		&ErrorKind::TableNotFound(_)
	);
	assert_matches!(
		db.del(&User::default(), guid::new_at(1)).unwrap_err().kind(),
		&ErrorKind::TableNotFound(_)
	);
	assert_matches!(
		db.has(&User::default(), &[]).unwrap_err().kind(),
		&ErrorKind::TableNotFound(_)
	);
	assert_matches!(
		db.find(&User::default(), &Search::default()).unwrap_err().kind(),
		&ErrorKind::TableNotFound(_)
	);
}

quickcheck! {
	fn quickcheck_written_records_stay_coherent(values: Vec<(String, String)>) -> bool {
		// a handful of records keeps the sync commits cheap
		let values: Vec<_> = values.into_iter().take(8).collect();
		let temp = TempDir::new("objdb_quickcheck_coherent").unwrap();
		let db = Database::open(temp.path(), Options::default()).unwrap();
		db.maintain(&User::default()).unwrap();

		let mut users = Vec::new();
		for (i, value) in values.iter().enumerate() {
			let user = User {
				id: guid::new_at(1000 + i as u32),
				email: value.0.clone(),
				age: value.1.clone(),
			};
			db.put(&user).unwrap();
			users.push(user);
		}

		for user in &users {
			let mut got = User::default();
			db.get(&mut got, user.id).unwrap();
			if got != *user {
				return false;
			}
			if !db.has(user, &["email"]).unwrap() || !db.has(user, &["age"]).unwrap() {
				return false;
			}
			// exactly one entry per declared field carries this id and
			// exactly the written value bytes
			let found = db.find(&User::default(), &Search {
				index: vec!["email".into()],
				filter: Some(Box::new(move |id, _, value| {
					*id == user.id && value == user.email.as_bytes()
				})),
				..Default::default()
			}).unwrap();
			if found != vec![user.id] {
				return false;
			}
		}

		for user in &users {
			db.del(&User::default(), user.id).unwrap();
		}
		!db.has(&User::default(), &[]).unwrap()
	}
}

quickcheck! {
	fn quickcheck_overwrite_replaces_index_entries(first: String, second: String) -> bool {
		let temp = TempDir::new("objdb_quickcheck_overwrite").unwrap();
		let db = Database::open(temp.path(), Options::default()).unwrap();
		db.maintain(&User::default()).unwrap();

		let mut user = User {
			id: guid::new_at(1000),
			email: first.clone(),
			age: "030".into(),
		};
		db.put(&user).unwrap();
		user.email = second.clone();
		db.put(&user).unwrap();

		let old_remains = db.has(&User::probe(&first, ""), &["email"]).unwrap();
		old_remains == (first == second)
			&& db.has(&User::probe(&second, ""), &["email"]).unwrap()
	}
}

#[test]
fn test_prefix_multiplexes_one_engine() {
	let temp = TempDir::new("objdb_prefix").unwrap();
	let alpha = Options {
		prefix: b"alpha".to_vec(),
		..Default::default()
	};
	let beta = Options {
		prefix: b"beta".to_vec(),
		..Default::default()
	};

	let db = Database::open(temp.path(), alpha.clone()).unwrap();
	db.maintain(&User::default()).unwrap();
	let a = User::new(1000, "x@y", "030");
	db.put(&a).unwrap();
	db.close().unwrap();

	// another prefix sees a disjoint store in the same engine
	let db = Database::open(temp.path(), beta).unwrap();
	db.maintain(&User::default()).unwrap();
	assert!(!db.has(&User::default(), &[]).unwrap());
	db.put(&User::new(2000, "q@r", "050")).unwrap();
	db.close().unwrap();

	// the first store still answers with its own records only
	let db = Database::open(temp.path(), alpha).unwrap();
	db.maintain(&User::default()).unwrap();
	assert_eq!(db.find(&User::default(), &Search::default()).unwrap(), vec![a.id]);
}
