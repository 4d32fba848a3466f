use std::process::ExitCode;

use clap::Parser;
use scanqr::app::App;
use scanqr::cli::{Cli, Command, RemoteCommand};
use scanqr::config::Config;
use scanqr::logging;
use scanqr::model::{NewScannedCode, ScanEvent};
use scanqr::remote::{HttpRemote, RemoteCodes};
use scanqr::report;
use scanqr::store;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // remote calls never touch the local database, so it is not opened for them
    let command = match cli.command {
        Command::Remote(command) => return run_remote(&HttpRemote::new(&config.remote), command),
        command => command,
    };

    let mut app = match App::start(&config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: failed to open scan database: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&mut app, command);

    if let Err(e) = app.shutdown() {
        eprintln!("warning: failed to close scan database: {e}");
    }

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(app: &mut App, command: Command) -> store::Result<ExitCode> {
    match command {
        Command::Scan(args) => {
            let event = ScanEvent {
                data: args.data,
                kind: args.kind,
            };
            let outcome = app.handle_scan(event, args.skip_duplicates)?;

            if !args.json {
                match &outcome.inserted {
                    Some(code) => println!("recorded {}\n", code.id),
                    None => println!("already recorded, skipped\n"),
                }
            }
            report::print_codes(&outcome.codes, args.json);
        }
        Command::List(args) => {
            report::print_codes(&app.store().list()?, args.json);
        }
        Command::Show(args) => match app.store().get(&args.id)? {
            Some(code) => report::print_code(&code, args.json),
            None => {
                eprintln!("No scan with ID '{}'", args.id);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Delete(args) => {
            let deleted = app.store().delete(&args.id)?;
            if args.json {
                println!("{}", serde_json::json!({ "id": &args.id, "deleted": deleted }));
            } else if deleted {
                println!("deleted {}", args.id);
            } else {
                println!("no scan with ID '{}', nothing deleted", args.id);
            }
        }
        Command::Clear => {
            let removed = app.store().clear()?;
            println!("deleted {removed} scan(s)");
        }
        Command::Exists(args) => {
            let found = app.store().exists(&args.data)?;
            println!("{found}");
            if !found {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Stats(args) => {
            report::print_stats(&app.store().stats()?, args.json);
        }
        Command::Status(args) => {
            let health = app.store().health()?;
            report::print_health(&health, args.json);
            if health.status.is_degraded() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Rebuild => {
            let restored = app.store_mut().rebuild()?;
            println!("rebuilt scan table, {restored} scan(s) kept");
        }
        Command::Remote(command) => return Ok(run_remote(app.remote(), command)),
    }

    Ok(ExitCode::SUCCESS)
}

/// Remote failures are already logged by the client; only the outcome is reported here.
fn run_remote(remote: &impl RemoteCodes, command: RemoteCommand) -> ExitCode {
    match command {
        RemoteCommand::List(args) => {
            report::print_codes(&remote.list(), args.json);
        }
        RemoteCommand::Get(args) => match remote.get_by_id(&args.id) {
            Some(code) => report::print_code(&code, args.json),
            None => {
                eprintln!("Remote scan '{}' not available", args.id);
                return ExitCode::FAILURE;
            }
        },
        RemoteCommand::Push(args) => {
            match remote.create(&NewScannedCode::new(args.data, args.kind)) {
                Some(code) => report::print_code(&code, args.json),
                None => {
                    eprintln!("Remote service did not accept the scan");
                    return ExitCode::FAILURE;
                }
            }
        }
        RemoteCommand::Delete(args) => {
            let deleted = remote.delete_by_id(&args.id);
            if args.json {
                println!("{}", serde_json::json!({ "id": &args.id, "deleted": deleted }));
            } else if deleted {
                println!("deleted remote {}", args.id);
            }
            if !deleted {
                eprintln!("Remote scan '{}' could not be deleted", args.id);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
