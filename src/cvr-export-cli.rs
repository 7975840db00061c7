//! An offline tool for inspecting scanner exports.
//! This uses the server's own export reader and import pipeline, against an
//! in-memory store, so a clean `check` means the server would accept the
//! export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};

use cvr_tally_backend::{
    external::{FsCvrReader, FsMediaLister, HmacAuthenticator},
    import::{ElectionLocks, ExportLocator, ImportCoordinator, ImportError, ImportOptions},
    model::{api::ImportSummary, cvr::CvrExportMetadata, election::ElectionDefinition},
    store::{CvrStore, MemoryStore},
    tabulation::TabulationCache,
};

const PROGRAM_NAME: &str = "cvr-export-cli";

const ABOUT_TEXT: &str = "Inspect cast vote record exports.

EXIT CODES:
     0: Success.
   255: Ran successfully, but the export would be rejected.
 Other: Error.";

const LIST: &str = "list";
const CHECK: &str = "check";
const MEDIA_ROOT: &str = "MEDIA_ROOT";
const EXPORT_DIR: &str = "EXPORT_DIR";
const ELECTION: &str = "ELECTION";
const SKIP_ELECTION_HASH_CHECK: &str = "skip-election-hash-check";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    let election = Arg::new(ELECTION)
        .help("The path to the JSON election definition")
        .action(ArgAction::Set)
        .required(true);

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new(LIST)
                .about("List the election's exports on mounted media, newest first")
                .arg(
                    Arg::new(MEDIA_ROOT)
                        .help("Where the media is mounted")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(election.clone()),
        )
        .subcommand(
            Command::new(CHECK)
                .about("Check that an export would be imported, without storing anything")
                .arg(
                    Arg::new(EXPORT_DIR)
                        .help("The export directory")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(election)
                .arg(
                    Arg::new(SKIP_ELECTION_HASH_CHECK)
                        .long(SKIP_ELECTION_HASH_CHECK)
                        .help("Accept records made for a different election definition")
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the election definition.
    Format(String),
    /// The export would be rejected.
    Rejected(ImportError),
}

fn load_definition(path: &Path) -> Result<ElectionDefinition, Error> {
    let data = std::fs::read(path).map_err(|e| Error::IO(format!("{}: {e}", path.display())))?;
    ElectionDefinition::from_json(&data).map_err(|e| Error::Format(e.to_string()))
}

async fn list(media_root: &Path, election: &Path) -> Result<Vec<CvrExportMetadata>, Error> {
    let definition = load_definition(election)?;
    let locator = ExportLocator::new(
        Arc::new(FsMediaLister::new(media_root)),
        Arc::new(FsCvrReader),
    );
    locator
        .list(&definition)
        .await
        .map_err(|e| Error::IO(e.to_string()))
}

async fn check(
    export_dir: &Path,
    election: &Path,
    skip_election_hash_check: bool,
) -> Result<ImportSummary, Error> {
    let definition = load_definition(election)?;
    let store = Arc::new(MemoryStore::new());
    let election_id = store
        .register_election(&definition)
        .await
        .map_err(|e| Error::IO(e.to_string()))?;
    // Signatures need the server's key; only the contents are checked here.
    let coordinator = ImportCoordinator::new(
        store,
        Arc::new(FsCvrReader),
        Arc::new(HmacAuthenticator::new(Vec::new())),
        Arc::new(TabulationCache::new()),
        Arc::new(ElectionLocks::new()),
        ImportOptions {
            skip_authentication: true,
            skip_election_hash_check,
        },
    );
    match coordinator.import(election_id, &definition, export_dir).await {
        Ok(summary) => Ok(summary),
        Err(err @ (ImportError::Read(_) | ImportError::Store(_))) => Err(Error::IO(err.to_string())),
        Err(err) => Err(Error::Rejected(err)),
    }
}

/// Run the requested subcommand, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let runtime = match rocket::tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            println!("IO error: {e}");
            return 1;
        }
    };

    // Subcommands and their required arguments are guaranteed to be present.
    let result = match args.subcommand() {
        Some((LIST, args)) => {
            let media_root: &String = args.get_one(MEDIA_ROOT).unwrap();
            let election: &String = args.get_one(ELECTION).unwrap();
            runtime
                .block_on(list(Path::new(media_root), Path::new(election)))
                .map(|exports| {
                    if exports.is_empty() {
                        println!("No exports found.");
                    }
                    for export in exports {
                        println!(
                            "{}\t{}\t{} sheet{}\t{}",
                            export.name,
                            if export.is_test_mode { "test" } else { "official" },
                            export.cvr_count,
                            if export.cvr_count != 1 { "s" } else { "" },
                            export.scanner_ids.into_iter().collect::<Vec<_>>().join(",")
                        );
                    }
                })
        }
        Some((CHECK, args)) => {
            let export_dir: &String = args.get_one(EXPORT_DIR).unwrap();
            let election: &String = args.get_one(ELECTION).unwrap();
            let skip = args.get_flag(SKIP_ELECTION_HASH_CHECK);
            runtime
                .block_on(check(&PathBuf::from(export_dir), Path::new(election), skip))
                .map(|summary| {
                    println!(
                        "Export {} would be imported in {} mode: {} record{}.",
                        summary.file_name,
                        summary.file_mode,
                        summary.newly_added,
                        if summary.newly_added != 1 { "s" } else { "" }
                    );
                })
        }
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(()) => 0,
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid election definition: {msg}");
            1
        }
        Err(Error::Rejected(err)) => {
            let location = err
                .index()
                .map(|index| format!(" (record {index})"))
                .unwrap_or_default();
            let detail = err
                .detail()
                .map(|detail| format!(" [{detail}]"))
                .unwrap_or_default();
            println!(
                "Export rejected: {}{location}{detail}: {err}",
                err.subtype()
            );
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
