use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::{json, Value};
use tracing::debug;

use liab_store::{Flake, Item, Schema, Store, StoreConfig, StoreResult, Txn, WriteTxn};

use crate::cli::*;

/// One item as printed by the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: Flake,
    pub type_name: Option<String>,
    pub payload: Option<Value>,
}

impl Row {
    fn read<T: Txn>(item: &Item<'_, T>) -> StoreResult<Self> {
        Ok(Self {
            id: item.id(),
            type_name: item.type_name().map(str::to_string),
            payload: item.get()?,
        })
    }

    fn to_json(&self) -> Value {
        json!({ "id": self.id.to_hex(), "type": self.type_name, "payload": self.payload })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Rows(Vec<Row>),
    Done(String),
}

impl Output {
    fn to_json(&self) -> Value {
        match self {
            Output::Rows(rows) => Value::Array(rows.iter().map(Row::to_json).collect()),
            Output::Done(message) => json!({ "ok": true, "message": message }),
        }
    }
}

pub fn run_command(cli: Cli) -> Result<()> {
    let schema = load_schema(cli.schema.as_deref())?;
    if let Command::Schema(_) = cli.command {
        return print_schema(&schema, cli.format);
    }

    let config = load_config(cli.config.as_deref(), cli.db)?;
    let store = Store::open(config, schema).context("failed to open store")?;
    let output = execute(&store, cli.command)?;
    render(cli.format, &output)
}

fn load_schema(path: Option<&Path>) -> Result<Schema> {
    match path {
        Some(path) => Schema::load(path).with_context(|| format!("failed to load schema {}", path.display())),
        None => Ok(Schema::new()),
    }
}

fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> Result<StoreConfig> {
    let mut config = match path {
        Some(path) => StoreConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(db) = db {
        config.path = db;
    }
    Ok(config)
}

/// Run one command against an open store.
pub fn execute(store: &Store, command: Command) -> Result<Output> {
    debug!(store = ?store, "executing command");
    match command {
        Command::NextId(args) => cmd_next_id(store, args),
        Command::Insert(args) => cmd_insert(store, args),
        Command::Show(args) => cmd_show(store, args),
        Command::List(args) => cmd_list(store, args),
        Command::Append(args) => cmd_append(store, args),
        Command::Log(args) => cmd_log(store, args),
        Command::Link(args) => cmd_link(store, args),
        Command::Members(args) => cmd_members(store, args),
        Command::Schema(_) => Ok(Output::Done(store.schema().to_toml_string()?)),
    }
}

fn cmd_next_id(store: &Store, args: NextIdArgs) -> Result<Output> {
    let layout = store.config().flake;
    let ids = store.write(|wx| -> StoreResult<Vec<Flake>> { (0..args.count).map(|_| wx.next_id()).collect() })?;
    let rows = ids
        .into_iter()
        .map(|id| {
            let parts = id.parts(&layout);
            Row {
                id,
                type_name: None,
                payload: Some(json!({
                    "timestamp_ms": parts.timestamp_ms,
                    "worker_id": parts.worker_id,
                    "sequence": parts.sequence,
                })),
            }
        })
        .collect();
    Ok(Output::Rows(rows))
}

fn cmd_insert(store: &Store, args: InsertArgs) -> Result<Output> {
    let payload = parse_payload(&args.payload)?;
    let row = store.write(|wx| -> StoreResult<Row> {
        let item = wx.hash(&args.type_name)?.insert(&payload)?;
        Row::read(&item)
    })?;
    Ok(Output::Rows(vec![row]))
}

fn cmd_show(store: &Store, args: ItemArgs) -> Result<Output> {
    let id = parse_id(&args.id)?;
    let row = store.read(|rx| -> Result<Row> {
        let item = existing(rx, &args.type_name, id)?;
        Ok(Row::read(&item)?)
    })?;
    Ok(Output::Rows(vec![row]))
}

fn cmd_list(store: &Store, args: ListArgs) -> Result<Output> {
    let rows = store.read(|rx| -> StoreResult<Vec<Row>> {
        rx.hash(&args.type_name)?
            .tail()
            .take(args.limit)
            .map(|item| item.and_then(|item| Row::read(&item)))
            .collect()
    })?;
    Ok(Output::Rows(rows))
}

fn cmd_append(store: &Store, args: AppendArgs) -> Result<Output> {
    let payload = parse_payload(&args.payload)?;
    let target = args.target;
    let id = parse_id(&target.item.id)?;
    let row = store.write(|wx| -> Result<Row> {
        let owner = existing(wx, &target.item.type_name, id)?;
        let entry = owner.stream(&target.field)?.append(&payload)?;
        Ok(Row::read(&entry)?)
    })?;
    Ok(Output::Rows(vec![row]))
}

fn cmd_log(store: &Store, args: LogArgs) -> Result<Output> {
    let target = args.target;
    let id = parse_id(&target.item.id)?;
    let rows = store.read(|rx| -> Result<Vec<Row>> {
        let owner = existing(rx, &target.item.type_name, id)?;
        let rows = owner
            .stream(&target.field)?
            .tail()
            .take(args.limit)
            .map(|entry| entry.and_then(|entry| Row::read(&entry)))
            .collect::<StoreResult<_>>()?;
        Ok(rows)
    })?;
    Ok(Output::Rows(rows))
}

fn cmd_link(store: &Store, args: LinkArgs) -> Result<Output> {
    let target = args.target;
    let id = parse_id(&target.item.id)?;
    let member_id = parse_id(&args.member)?;
    store.write(|wx| -> Result<Output> {
        let owner = existing(wx, &target.item.type_name, id)?;
        let bucket = owner.bucket(&target.field)?;
        let member = existing(wx, bucket.member_type(), member_id)?;
        let label = format!("{}.{}", target.item.type_name, target.field);
        if args.delete {
            if bucket.remove(&member)? {
                Ok(Output::Done(format!("removed {member_id} from {label}")))
            } else {
                Ok(Output::Done(format!("{member_id} was not in {label}")))
            }
        } else {
            bucket.set(&member)?;
            Ok(Output::Done(format!("added {member_id} to {label}")))
        }
    })
}

fn cmd_members(store: &Store, args: FieldArgs) -> Result<Output> {
    let id = parse_id(&args.item.id)?;
    let rows = store.read(|rx| -> Result<Vec<Row>> {
        let owner = existing(rx, &args.item.type_name, id)?;
        let rows = owner
            .bucket(&args.field)?
            .get()?
            .iter()
            .map(Row::read)
            .collect::<StoreResult<_>>()?;
        Ok(rows)
    })?;
    Ok(Output::Rows(rows))
}

fn existing<'t, T: Txn>(tx: &'t T, type_name: &str, id: Flake) -> Result<Item<'t, T>> {
    let item = tx.hash(type_name)?.get(id);
    if !item.exists()? {
        bail!("no `{type_name}` with id {id}");
    }
    Ok(item)
}

fn parse_id(s: &str) -> Result<Flake> {
    s.parse().with_context(|| format!("invalid identifier `{s}`"))
}

fn parse_payload(s: &str) -> Result<Value> {
    serde_json::from_str(s).with_context(|| format!("payload is not valid JSON: {s}"))
}

fn print_schema(schema: &Schema, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", schema.to_toml_string()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(schema)?),
    }
    Ok(())
}

fn render(format: OutputFormat, output: &Output) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output.to_json())?),
        OutputFormat::Text => match output {
            Output::Rows(rows) if rows.is_empty() => println!("{}", "(empty)".dimmed()),
            Output::Rows(rows) => {
                for row in rows {
                    let payload = match &row.payload {
                        Some(value) => value.to_string(),
                        None => "-".dimmed().to_string(),
                    };
                    match &row.type_name {
                        Some(ty) => println!("{}  {}  {}", row.id.to_hex().yellow(), ty.cyan(), payload),
                        None => println!("{}  {}", row.id.to_hex().yellow(), payload),
                    }
                }
            }
            Output::Done(message) => println!("{} {}", "✓".green().bold(), message),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use liab_store::{FlakeConfig, TypeDecl};

    use super::*;

    fn store(dir: &tempfile::TempDir) -> Store {
        let schema = Schema::new()
            .with_type("user", TypeDecl::new().bucket("rooms", "room"))
            .with_type("room", TypeDecl::new().stream("events"));
        Store::open(StoreConfig::at(dir.path().join("cli.redb")), schema).unwrap()
    }

    fn run(store: &Store, args: &[&str]) -> Result<Output> {
        let mut argv = vec!["liab"];
        argv.extend_from_slice(args);
        execute(store, Cli::try_parse_from(argv)?.command)
    }

    fn single(output: Output) -> Row {
        match output {
            Output::Rows(mut rows) if rows.len() == 1 => rows.remove(0),
            other => panic!("expected one row, got {other:?}"),
        }
    }

    #[test]
    fn insert_then_show() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let inserted = single(run(&store, &["insert", "user", r#"{"name":"ann"}"#]).unwrap());
        assert_eq!(inserted.type_name.as_deref(), Some("user"));

        let hex = inserted.id.to_hex();
        let shown = single(run(&store, &["show", "user", &hex]).unwrap());
        assert_eq!(shown, inserted);
        assert_eq!(shown.payload, Some(json!({"name": "ann"})));
    }

    #[test]
    fn eight_byte_ids_show_by_printed_hex() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            flake: FlakeConfig {
                worker_bits: 8,
                sequence_bits: 16,
                byte_width: 8,
                ..Default::default()
            },
            ..StoreConfig::at(dir.path().join("wide.redb"))
        };
        let schema = Schema::new().with_type("user", TypeDecl::new());
        let store = Store::open(config, schema).unwrap();

        let inserted = single(run(&store, &["insert", "user", r#"{"name":"ann"}"#]).unwrap());
        assert!(inserted.id > Flake::MAX);
        let hex = inserted.id.to_hex();
        assert_eq!(hex.len(), 16);
        let shown = single(run(&store, &["show", "user", &hex]).unwrap());
        assert_eq!(shown, inserted);
    }

    #[test]
    fn show_missing_item_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let err = run(&store, &["show", "user", "00000000000001"]).unwrap_err();
        assert!(err.to_string().contains("no `user`"));
    }

    #[test]
    fn list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let a = single(run(&store, &["insert", "room", "\"a\""]).unwrap());
        let b = single(run(&store, &["insert", "room", "\"b\""]).unwrap());
        assert_eq!(run(&store, &["list", "room"]).unwrap(), Output::Rows(vec![b.clone(), a]));
        assert_eq!(run(&store, &["list", "room", "-n", "1"]).unwrap(), Output::Rows(vec![b]));
    }

    #[test]
    fn append_then_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let room = single(run(&store, &["insert", "room", "{}"]).unwrap()).id.to_hex();
        run(&store, &["append", "room", &room, "events", "1"]).unwrap();
        run(&store, &["append", "room", &room, "events", "2"]).unwrap();

        let Output::Rows(rows) = run(&store, &["log", "room", &room, "events"]).unwrap() else {
            panic!("expected rows");
        };
        let payloads: Vec<_> = rows.into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec![Some(json!(2)), Some(json!(1))]);
    }

    #[test]
    fn link_and_unlink_members() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let user = single(run(&store, &["insert", "user", "{}"]).unwrap()).id.to_hex();
        let room = single(run(&store, &["insert", "room", "{}"]).unwrap());
        let room_hex = room.id.to_hex();

        run(&store, &["link", "user", &user, "rooms", &room_hex]).unwrap();
        assert_eq!(
            run(&store, &["members", "user", &user, "rooms"]).unwrap(),
            Output::Rows(vec![room])
        );

        run(&store, &["link", "-d", "user", &user, "rooms", &room_hex]).unwrap();
        assert_eq!(
            run(&store, &["members", "user", &user, "rooms"]).unwrap(),
            Output::Rows(vec![])
        );
    }

    #[test]
    fn failed_command_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let user = single(run(&store, &["insert", "user", "{}"]).unwrap()).id.to_hex();
        // `events` is not a field of `user`.
        assert!(run(&store, &["append", "user", &user, "events", "1"]).is_err());
        assert!(run(&store, &["link", "user", &user, "rooms", "00000000000001"]).is_err());
        assert_eq!(run(&store, &["list", "room"]).unwrap(), Output::Rows(vec![]));
    }

    #[test]
    fn next_id_reports_parts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let Output::Rows(rows) = run(&store, &["next-id", "-n", "3"]).unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(rows[0].payload.as_ref().unwrap()["worker_id"], json!(0));
    }

    #[test]
    fn bad_payload_and_id_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(run(&store, &["insert", "user", "{not json"]).is_err());
        assert!(run(&store, &["show", "user", "zz"]).is_err());
    }

    #[test]
    fn config_path_is_overridden_by_db_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("liab.toml");
        std::fs::write(&config_path, "path = \"elsewhere.redb\"\nworker_id = 2\n").unwrap();

        let config = load_config(Some(&config_path), Some(PathBuf::from("here.redb"))).unwrap();
        assert_eq!(config.path, PathBuf::from("here.redb"));
        assert_eq!(config.worker_id, 2);
    }

    #[test]
    fn json_output_shape() {
        let row = Row {
            id: Flake::from_raw(1),
            type_name: Some("user".into()),
            payload: Some(json!({"name": "ann"})),
        };
        let value = Output::Rows(vec![row]).to_json();
        assert_eq!(value[0]["id"], json!("00000000000001"));
        assert_eq!(value[0]["type"], json!("user"));
        assert_eq!(Output::Done("ok".into()).to_json()["ok"], json!(true));
    }
}
