extern crate clap;
extern crate env_logger;
extern crate objdb;
#[macro_use]
extern crate serde_derive;

use clap::{App, Arg, ArgMatches, SubCommand};
use objdb::{codec, guid, Database, Error, Guid, Object, Options, Search};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Note {
	#[serde(rename = "d")]
	id: Guid,
	#[serde(rename = "t")]
	title: String,
	#[serde(rename = "b")]
	body: String,
}

impl Object for Note {
	fn table_name(&self) -> &str {
		"note"
	}

	fn table_id(&self) -> Guid {
		self.id
	}

	fn table_index(&self) -> Vec<String> {
		vec!["title".into()]
	}

	fn table_field(&self, field: &str) -> Vec<u8> {
		match field {
			"title" => self.title.as_bytes().to_vec(),
			_ => Vec::new(),
		}
	}

	fn table_new(&self) -> Box<dyn Object> {
		Box::new(Note::default())
	}

	fn encode(&self) -> objdb::Result<Vec<u8>> {
		codec::encode(self)
	}

	fn decode(&mut self, bytes: &[u8]) -> objdb::Result<()> {
		*self = codec::decode(bytes)?;
		Ok(())
	}
}

fn open(db: &str) -> Result<Database, Error> {
	let db = Database::open(db, Options::default())?;
	db.maintain(&Note::default())?;
	Ok(db)
}

fn do_put(db: &str, title: &str, body: &str) -> Result<(), Error> {
	let db = open(db)?;
	let note = Note {
		id: guid::new(),
		title: title.into(),
		body: body.into(),
	};
	let id = db.put(&note)?;
	println!("{}", id);
	Ok(())
}

fn do_get(db: &str, id: &str) -> Result<(), Error> {
	let db = open(db)?;
	let mut note = Note::default();
	match db.get(&mut note, id.parse()?) {
		Ok(()) => {
			println!("title: {}", note.title);
			println!("body: {}", note.body);
		}
		Err(err) => {
			println!("no note found for this id: {}.", err);
		}
	}
	Ok(())
}

fn do_del(db: &str, id: &str) -> Result<(), Error> {
	let db = open(db)?;
	db.del(&Note::default(), id.parse()?)?;
	Ok(())
}

fn do_find(db: &str, title: Option<&str>, limit: usize, desc: bool) -> Result<(), Error> {
	let db = open(db)?;
	let search = match title {
		Some(title) => Search {
			limit: limit,
			desc: desc,
			index: vec!["title".into()],
			filter: Some(Box::new(move |_, _, value| value == title.as_bytes())),
			..Default::default()
		},
		None => Search {
			limit: limit,
			desc: desc,
			..Default::default()
		},
	};
	for id in db.find(&Note::default(), &search)? {
		println!("{}", id);
	}
	Ok(())
}

fn read_parameters<'a>(matches: &'a ArgMatches) -> Result<&'a str, ()> {
	matches.value_of("DB").ok_or(())
}

fn main() {
	env_logger::init();

	let db_arg = Arg::with_name("DB")
		.short("d")
		.long("db")
		.takes_value(true);
	let id_arg = Arg::with_name("ID")
		.short("i")
		.long("id")
		.takes_value(true);

	let matches = App::new("objdb-cli")
		.version("0.1.0")
		.about("A simple command line interface for objdb notes")
		.subcommand(
			SubCommand::with_name("put")
				.about("Store a new note and print its id")
				.arg(db_arg.clone())
				.arg(Arg::with_name("TITLE").short("t").long("title").takes_value(true))
				.arg(Arg::with_name("BODY").short("b").long("body").takes_value(true)),
		)
		.subcommand(
			SubCommand::with_name("get")
				.about("Print the note stored under an id")
				.arg(db_arg.clone())
				.arg(id_arg.clone()),
		)
		.subcommand(
			SubCommand::with_name("del")
				.about("Delete the note stored under an id")
				.arg(db_arg.clone())
				.arg(id_arg.clone()),
		)
		.subcommand(
			SubCommand::with_name("find")
				.about("List note ids, optionally restricted to a title")
				.arg(db_arg.clone())
				.arg(Arg::with_name("TITLE").short("t").long("title").takes_value(true))
				.arg(Arg::with_name("LIMIT").short("l").long("limit").takes_value(true))
				.arg(Arg::with_name("DESC").long("desc")),
		)
		.get_matches();

	match matches.subcommand() {
		("put", Some(sub_m)) => {
			match (read_parameters(sub_m), sub_m.value_of("TITLE"), sub_m.value_of("BODY")) {
				(Ok(db), Some(title), Some(body)) => {
					do_put(db, title, body).expect("execute put error.");
				}
				_ => println!("errors for put."),
			}
		}
		("get", Some(sub_m)) => {
			match (read_parameters(sub_m), sub_m.value_of("ID")) {
				(Ok(db), Some(id)) => {
					do_get(db, id).expect("execute get error.");
				}
				_ => println!("errors for get."),
			}
		}
		("del", Some(sub_m)) => {
			match (read_parameters(sub_m), sub_m.value_of("ID")) {
				(Ok(db), Some(id)) => {
					do_del(db, id).expect("execute del error.");
				}
				_ => println!("errors for del."),
			}
		}
		("find", Some(sub_m)) => {
			if let Ok(db) = read_parameters(sub_m) {
				let limit = sub_m
					.value_of("LIMIT")
					.and_then(|l| l.parse().ok())
					.unwrap_or(0);
				do_find(db, sub_m.value_of("TITLE"), limit, sub_m.is_present("DESC"))
					.expect("execute find error.");
			} else {
				println!("errors for find.");
			}
		}
		_ => {}
	}
}
