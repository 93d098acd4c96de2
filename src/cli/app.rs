use super::fields::parse_assignments;
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use crm_store::store::GeneratedId;
use crm_store::{
    AuthService, Collection, CollectionKind, CollectionSet, EntityStore, KeyValueStore, StoreConfig,
    User,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "crm-store")]
#[command(about = "Manage the school/program registry stored on this machine")]
pub struct App {
    /// Data directory (overrides CRM_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Do not push snapshots to the save server
    #[arg(long, global = true)]
    no_mirror: bool,

    /// Time given to in-flight mirror pushes before exiting
    #[arg(long, global = true, default_value_t = 500)]
    mirror_grace_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the records of a collection (institutions, programs, users)
    List { collection: String },
    /// Add a record built from field=value pairs
    Add {
        collection: String,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },
    /// Patch a record (by id, or by email for users)
    Update {
        collection: String,
        id: String,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },
    Delete { collection: String, id: String },
    /// Print every collection as one JSON document
    Export {
        /// Drop logos and credentials
        #[arg(long)]
        strip: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Overwrite the collections present in a JSON snapshot file
    Import {
        file: PathBuf,
        #[arg(long)]
        strip_logos: bool,
    },
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Storage usage and degradation counters
    Usage,
}

impl App {
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub async fn run(self) -> Result<()> {
        let mut config = StoreConfig::from_env().context("failed to load configuration")?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if self.no_mirror {
            config.mirror.enabled = false;
        }
        let store = EntityStore::open(&config).context("failed to open entity store")?;

        self.execute(&store)?;

        if let Some(outcome) = store.last_write_outcome().filter(|o| o.is_degraded()) {
            eprintln!("warning: storage is full, last write was {outcome:?}");
        }

        if config.mirror.enabled && self.mirror_grace_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.mirror_grace_ms)).await;
        }
        Ok(())
    }

    fn execute(&self, store: &EntityStore) -> Result<()> {
        match &self.command {
            Command::List { collection } => match collection_kind(collection)? {
                CollectionKind::Institutions => print_json(&store.institutions().list()),
                CollectionKind::Programs => print_json(&store.programs().list()),
                CollectionKind::Users => print_json(&store.users().list()),
            },
            Command::Add { collection, fields } => {
                let document = Value::Object(parse_assignments(fields)?);
                match collection_kind(collection)? {
                    CollectionKind::Institutions => {
                        println!("{}", add_generated(store.institutions(), document)?)
                    }
                    CollectionKind::Programs => {
                        println!("{}", add_generated(store.programs(), document)?)
                    }
                    CollectionKind::Users => {
                        let user: User = decode(document)?;
                        let email = user.email.clone();
                        if !store.users().add(user) {
                            return Err(anyhow!("user '{email}' already exists or has no email"));
                        }
                        println!("{email}");
                    }
                }
                Ok(())
            }
            Command::Update {
                collection,
                id,
                fields,
            } => {
                let patch = parse_assignments(fields)?;
                let updated = match collection_kind(collection)? {
                    CollectionKind::Institutions => store.institutions().update(id, &patch),
                    CollectionKind::Programs => store.programs().update(id, &patch),
                    CollectionKind::Users => store.users().update(id, &patch),
                };
                if !updated {
                    return Err(anyhow!("no {collection} record with id '{id}'"));
                }
                Ok(())
            }
            Command::Delete { collection, id } => {
                match collection_kind(collection)? {
                    CollectionKind::Institutions => store.institutions().delete(id),
                    CollectionKind::Programs => store.programs().delete(id),
                    CollectionKind::Users => store.users().delete(id),
                };
                Ok(())
            }
            Command::Export { strip, out } => {
                let snapshot = store.export_snapshot(*strip);
                let encoded = serde_json::to_string_pretty(&snapshot)?;
                match out {
                    Some(path) => {
                        fs::write(path, encoded)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        println!("{} records written to {}", snapshot.record_count(), path.display());
                    }
                    None => println!("{encoded}"),
                }
                Ok(())
            }
            Command::Import { file, strip_logos } => {
                let raw = fs::read_to_string(file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                let collections: CollectionSet = serde_json::from_str(&raw)
                    .with_context(|| format!("{} is not a snapshot document", file.display()))?;
                let written = store.replace_all(collections, *strip_logos);
                for kind in CollectionKind::ALL {
                    let count = match kind {
                        CollectionKind::Institutions => written.escuelas.as_ref().map(Vec::len),
                        CollectionKind::Programs => written.carreras.as_ref().map(Vec::len),
                        CollectionKind::Users => written.users.as_ref().map(Vec::len),
                    };
                    if let Some(count) = count {
                        println!("{kind}: {count} records");
                    }
                }
                Ok(())
            }
            Command::Register {
                name,
                email,
                password,
            } => {
                if !AuthService::new(store).register(name.as_deref(), email, password) {
                    return Err(anyhow!("email '{email}' is already registered"));
                }
                Ok(())
            }
            Command::Usage => {
                let usage = store.storage().usage()?;
                let stats = store.degradation_stats();
                println!("used bytes:  {}", usage.used_bytes);
                match usage.quota_bytes {
                    Some(quota) => println!("quota bytes: {quota}"),
                    None => println!("quota bytes: unlimited"),
                }
                for kind in CollectionKind::ALL {
                    let count = match kind {
                        CollectionKind::Institutions => store.institutions().len(),
                        CollectionKind::Programs => store.programs().len(),
                        CollectionKind::Users => store.users().len(),
                    };
                    println!("{kind}: {count} records");
                }
                println!("records kept on truncation: {}", store.max_records_on_degrade());
                println!("{stats:?}");
                Ok(())
            }
        }
    }
}

fn collection_kind(name: &str) -> Result<CollectionKind> {
    CollectionKind::parse(name).ok_or_else(|| {
        anyhow!("unknown collection '{name}' (expected institutions, programs or users)")
    })
}

fn decode<R: DeserializeOwned>(document: Value) -> Result<R> {
    serde_json::from_value(document).context("fields do not form a valid record")
}

fn add_generated<R: GeneratedId>(collection: Collection<'_, R>, document: Value) -> Result<String> {
    Ok(collection.add(decode::<R>(document)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
