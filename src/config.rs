use std::{path::PathBuf, sync::Arc};

use log::{error, info, warn};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    external::{FsCvrReader, FsMediaLister, HmacAuthenticator},
    import::ImportOptions,
    model::{election::ElectionDefinition, mongodb::ensure_indexes_exist},
    service::CvrService,
    store::{CvrStore, MongoStore},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    election_definition_path: PathBuf,
    media_mount_point: PathBuf,
    #[serde(default)]
    skip_artifact_authentication: bool,
    #[serde(default)]
    skip_election_hash_check: bool,
    // secrets
    artifact_key: String,
}

impl Config {
    /// JSON election definition served by this instance.
    pub fn election_definition_path(&self) -> &PathBuf {
        &self.election_definition_path
    }

    /// Where removable media is mounted.
    pub fn media_mount_point(&self) -> &PathBuf {
        &self.media_mount_point
    }

    /// Secret key that exports are signed with.
    pub fn artifact_key(&self) -> &[u8] {
        self.artifact_key.as_bytes()
    }

    /// Safety checks to disable. Only for controlled test environments.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            skip_authentication: self.skip_artifact_authentication,
            skip_election_hash_check: self.skip_election_hash_check,
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if config.skip_artifact_authentication {
            warn!("Export authentication is DISABLED");
        }
        if config.skip_election_hash_check {
            warn!("Election hash checking is DISABLED");
        }

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the indexes exist, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "cvr_tally".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// A fairing that loads the election definition, registers the election,
/// and places a [`CvrService`] for it into managed state.
///
/// Must be attached after [`ConfigFairing`] and [`DatabaseFairing`].
pub struct ElectionFairing;

#[rocket::async_trait]
impl Fairing for ElectionFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (Some(config), Some(client), Some(db)) = (
            rocket.state::<Config>(),
            rocket.state::<MongoClient>(),
            rocket.state::<Database>(),
        ) else {
            error!("Election setup requires the config and database to be loaded first");
            return Err(rocket);
        };

        let path = config.election_definition_path();
        let definition = match rocket::tokio::fs::read(path).await {
            Ok(data) => match ElectionDefinition::from_json(&data) {
                Ok(definition) => definition,
                Err(e) => {
                    error!("Invalid election definition {}: {e}", path.display());
                    return Err(rocket);
                }
            },
            Err(e) => {
                error!("Failed to read election definition {}: {e}", path.display());
                return Err(rocket);
            }
        };

        let store = Arc::new(MongoStore::new(client.clone(), db));
        let election_id = match store.register_election(&definition).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to register election: {e}");
                return Err(rocket);
            }
        };
        info!(
            "Serving election \"{}\" ({election_id}, hash {})",
            definition.election.title, definition.election_hash
        );

        let service = CvrService::new(
            election_id,
            definition,
            store,
            Arc::new(FsMediaLister::new(config.media_mount_point())),
            Arc::new(FsCvrReader),
            Arc::new(HmacAuthenticator::new(config.artifact_key())),
            config.import_options(),
        );
        Ok(rocket.manage(service))
    }
}
