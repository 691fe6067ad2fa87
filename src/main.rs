//! Command-line front end for the artifact registry.
//!
//! Bootstraps the embedded machine, replays every stored artifact and then
//! performs the requested action.
//!
//! # Usage
//! ```text
//! dcn [OPTIONS]
//! ```
//!
//! Settings come from `DCN_*` environment variables; flags override them.

use dcn::config::Config;
use dcn::core::execute::ExecuteRequest;
use dcn::core::records::{
    ArtifactKind, ConditionRecord, FeatureRecord, ParticleRecord, TransformationRecord,
};
use dcn::engine::Engine;
use dcn::loader::{Loader, LoaderError};
use dcn::registry::Registry;
use dcn::runner;
use dcn::types::address::Address;
use dcn::utils::log::{self, Level};
use dcn::{error, info, warn};
use serde::de::DeserializeOwned;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

enum Action {
    Deploy { kind: ArtifactKind, file: PathBuf },
    Execute { file: PathBuf },
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", e.kind(), e);
            process::exit(1);
        }
    };
    let mut action: Option<Action> = None;
    let mut sender: Option<Address> = None;

    let mut i = 1;
    while i < args.len() {
        let value = |n: usize| arg_value(&args, i, n);
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            "--solc" => {
                config.solc_path = PathBuf::from(value(1));
                i += 2;
            }
            "--pt" => {
                config.pt_path = PathBuf::from(value(1));
                i += 2;
            }
            "--storage" => {
                config.storage_path = PathBuf::from(value(1));
                i += 2;
            }
            "--log-level" => {
                config.log_level = match value(1).parse::<Level>() {
                    Ok(level) => level,
                    Err(e) => {
                        eprintln!("{}", e);
                        process::exit(1);
                    }
                };
                i += 2;
            }
            "--deploy" => {
                let Some(kind) = ArtifactKind::parse(value(1)) else {
                    eprintln!("Unknown artifact kind: {}", value(1));
                    process::exit(1);
                };
                action = Some(Action::Deploy {
                    kind,
                    file: PathBuf::from(value(2)),
                });
                i += 3;
            }
            "--execute" => {
                action = Some(Action::Execute {
                    file: PathBuf::from(value(1)),
                });
                i += 2;
            }
            "--sender" => {
                sender = match Address::from_hex(value(1)) {
                    Ok(address) => Some(address),
                    Err(e) => {
                        eprintln!("Invalid sender address {}: {}", value(1), e);
                        process::exit(1);
                    }
                };
                i += 2;
            }
            other => {
                eprintln!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    log::set_level(config.log_level);

    let engine = Engine::new(&config);
    if let Err(e) = engine.bootstrap().await {
        error!("Bootstrap failed: {}", e);
        process::exit(1);
    }

    let registry = Registry::new();
    let loader = match Loader::new(&config, engine.clone(), registry.clone()).await {
        Ok(loader) => loader,
        Err(e) => {
            error!(
                "Cannot prepare storage at {}: {}",
                config.storage_path.display(),
                e
            );
            process::exit(1);
        }
    };
    if let Err(e) = loader.ensure_build_version().await {
        error!("{}", e);
        process::exit(1);
    }
    match loader.load_all().await {
        Ok(()) => info!("Loaded stored artifacts from {}", loader.storage_path().display()),
        Err(e) => warn!("Some stored artifacts failed to load: {}", e.message),
    }

    match action {
        Some(Action::Deploy { kind, file }) => {
            let result = match kind {
                ArtifactKind::Transformation => deploy::<TransformationRecord>(&loader, &file).await,
                ArtifactKind::Condition => deploy::<ConditionRecord>(&loader, &file).await,
                ArtifactKind::Feature => deploy::<FeatureRecord>(&loader, &file).await,
                ArtifactKind::Particle => deploy::<ParticleRecord>(&loader, &file).await,
            };
            match result {
                Ok(address) => println!("{}", address),
                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            }
        }
        Some(Action::Execute { file }) => {
            let Some(sender) = sender else {
                eprintln!("--execute requires --sender <address>");
                process::exit(1);
            };
            let request: ExecuteRequest = match read_json(&file).await {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            };
            match runner::generate(&engine, sender, &request).await {
                Ok(samples) => match serde_json::to_string_pretty(&samples) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Failed to serialize samples: {}", e);
                        process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            }
        }
        None => info!(
            "Registry at {}, runner at {}",
            engine.registry_address(),
            engine.runner_address()
        ),
    }
}

/// Argument `n` places after the flag at `i`, or exit.
fn arg_value(args: &[String], i: usize, n: usize) -> &str {
    match args.get(i + n) {
        Some(v) => v,
        None => {
            eprintln!("{} requires an argument", args[i]);
            process::exit(1);
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("Cannot parse {}: {}", path.display(), e))
}

async fn deploy<R: dcn::loader::Artifact>(loader: &Loader, path: &Path) -> Result<Address, String> {
    let record: R = read_json(path).await?;
    loader
        .deploy(record)
        .await
        .map_err(|e: LoaderError| e.to_string())
}

const USAGE: &str = "\
Artifact registry over an embedded EVM

USAGE:
    {program} [OPTIONS]

OPTIONS:
    --solc <path>               Solidity compiler binary
    --pt <path>                 Contract tree with contracts/ and node_modules/
    --storage <path>            Storage root for records and build cache
    --log-level <level>         debug, info, warn or error
    --deploy <kind> <file>      Deploy the record in <file> (transformation, condition, feature, particle)
    --execute <file>            Run the execute request in <file> through the runner
    --sender <address>          Caller of --execute
    -h, --help                  Print this help message

ENVIRONMENT:
    DCN_SOLC, DCN_PT_PATH, DCN_STORAGE_PATH, DCN_LOG_LEVEL, DCN_GAS_LIMIT

FILES:
    <storage>/<kind>s/<name>.json
    <storage>/<kind>s/build/<name>.{bin,abi}
    <storage>/pt_solidity_build_version
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
