#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod external;
pub mod import;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod tabulation;

use config::{ConfigFairing, DatabaseFairing, ElectionFairing};
use logging::LoggerFairing;

/// The server, ready to ignite. Fairings run in the order attached: the
/// election needs both the config and the database.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(ElectionFairing)
}

/// A client for the database named by `db_uri`.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(db_uri)
        .await
        .expect("Could not connect to database")
}

/// A fresh database name for one test.
#[cfg(test)]
pub(crate) fn database() -> String {
    config::get_database_name()
}

/// The server backed by the given database, serving the example election
/// with a single example export on fake media.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    use std::sync::Arc;

    use crate::{
        external::fakes::{example_media, FakeAuthenticator},
        import::ImportOptions,
        model::{election::ElectionDefinition, mongodb::ensure_indexes_exist},
        service::CvrService,
        store::{CvrStore, MongoStore},
    };

    let db = client.database(db_name);
    ensure_indexes_exist(&db).await.unwrap();
    let definition = ElectionDefinition::example();
    let store = Arc::new(MongoStore::new(client.clone(), &db));
    let election_id = store.register_election(&definition).await.unwrap();
    let (media, reader) = example_media(&definition);
    let service = CvrService::new(
        election_id,
        definition,
        store,
        Arc::new(media),
        Arc::new(reader),
        Arc::new(FakeAuthenticator::default()),
        ImportOptions::default(),
    );

    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .manage(client)
        .manage(db)
        .manage(service)
}
