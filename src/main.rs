//! Kronikle CLI entry point

use std::process::ExitCode;

use clap::Parser;

use kronikle::cli::{
    app::{
        init_logging, load_catalog, load_merged_config, location_arg, open_catalog,
        open_recorder, DataPaths, EXIT_ERROR, EXIT_USAGE_ERROR,
    },
    args::{Cli, Commands},
    catalog_cmd::{handle_delete, handle_list, handle_play, handle_rename, handle_share},
    config_cmd::handle_config_command,
    presenter::Presenter,
    record_cmd::{handle_record, spawn_stdin_reader},
};
use kronikle::domain::config::{AppConfig, LogLevel};
use kronikle::domain::recording::Duration;
use kronikle::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut presenter = Presenter::new();
    let store = XdgConfigStore::new();

    if let Some(level) = cli.log_level.as_deref() {
        if let Err(e) = level.parse::<LogLevel>() {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    }

    let cli_config = AppConfig {
        data_dir: cli
            .data_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().to_string()),
        max_duration: None,
        log_level: cli.log_level.clone(),
    };
    let config = load_merged_config(&store, cli_config, &presenter).await;
    init_logging(config.log_level_or_default());

    let paths = DataPaths::from_config(&config);

    let result: Result<(), String> = match cli.command {
        Commands::Config { action } => handle_config_command(action, &store, &presenter)
            .await
            .map_err(|e| e.to_string()),

        Commands::Record { name, max_duration } => {
            let limit = match max_duration.or_else(|| config.max_duration.clone()) {
                Some(s) => match s.parse::<Duration>() {
                    Ok(d) => d,
                    Err(e) => {
                        presenter.error(&format!("Invalid max-duration: {}", e));
                        return ExitCode::from(EXIT_USAGE_ERROR);
                    }
                },
                None => Duration::default_max_duration(),
            };

            let recorder = open_recorder(&paths);
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            handle_record(
                &recorder,
                name,
                limit,
                spawn_stdin_reader(),
                shutdown,
                &mut presenter,
            )
            .await
            .map_err(|e| e.to_string())
        }

        Commands::List { search } => {
            let catalog = open_catalog(&paths);
            load_catalog(&catalog, &presenter).await;
            handle_list(&catalog, search.as_deref(), &presenter)
                .await
                .map_err(|e| e.to_string())
        }

        Commands::Rename { location, name } => {
            let catalog = open_catalog(&paths);
            load_catalog(&catalog, &presenter).await;
            handle_rename(&catalog, &location_arg(&location), &name, &presenter)
                .await
                .map_err(|e| e.to_string())
        }

        Commands::Delete { location } => {
            let catalog = open_catalog(&paths);
            load_catalog(&catalog, &presenter).await;
            handle_delete(&catalog, &location_arg(&location), &presenter)
                .await
                .map_err(|e| e.to_string())
        }

        Commands::Share { location, dest } => {
            let catalog = open_catalog(&paths);
            load_catalog(&catalog, &presenter).await;
            handle_share(&catalog, &location_arg(&location), &dest, &presenter)
                .await
                .map_err(|e| e.to_string())
        }

        Commands::Play { location } => {
            let recorder = open_recorder(&paths);
            load_catalog(recorder.catalog(), &presenter).await;
            handle_play(&recorder, &location_arg(&location), &mut presenter)
                .await
                .map_err(|e| e.to_string())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            presenter.error(&message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
