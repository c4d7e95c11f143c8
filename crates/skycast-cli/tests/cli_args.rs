use clap::Parser;
use skycast_cli::{Cli, Commands};
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn cli_without_command_trains_with_defaults() {
    let cli = Cli::parse_from(["skycast"]);
    assert!(cli.command.is_none());
    assert!(cli.global.config.is_none());
    let config = cli.global.pipeline_config().unwrap();
    assert_eq!(config.data.path, PathBuf::from("Bucharest_Hist_Temp.csv"));
    assert_eq!(config.output.dir, PathBuf::from("models"));
    assert_eq!(config.training.epochs, 100);
}

#[test]
fn cli_parses_global_flags_after_subcommand() {
    let cli = Cli::parse_from([
        "skycast",
        "train",
        "--data",
        "history.csv",
        "--output-dir",
        "out",
        "--epochs",
        "5",
    ]);
    assert_eq!(cli.global.data, Some(PathBuf::from("history.csv")));
    assert_eq!(cli.global.output_dir, Some(PathBuf::from("out")));
    match cli.command {
        Some(Commands::Train(cmd)) => assert_eq!(cmd.epochs, Some(5)),
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn cli_parses_preview_rows() {
    let cli = Cli::parse_from(["skycast", "preview"]);
    match cli.command {
        Some(Commands::Preview(cmd)) => assert_eq!(cmd.rows, 10),
        other => panic!("unexpected command: {:?}", other),
    }
    let cli = Cli::parse_from(["skycast", "preview", "--rows", "3"]);
    assert!(matches!(cli.command, Some(Commands::Preview(ref cmd)) if cmd.rows == 3));
}

#[test]
fn cli_synthesize_requires_out() {
    assert!(Cli::try_parse_from(["skycast", "synthesize", "--rows", "10"]).is_err());
    let cli = Cli::parse_from(["skycast", "synthesize", "--out", "x.csv", "--categories", "2"]);
    match cli.command {
        Some(Commands::Synthesize(cmd)) => {
            assert_eq!(cmd.rows, 1000);
            assert_eq!(cmd.categories, 2);
            assert_eq!(cmd.seed, 42);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn config_file_is_overridden_by_flags() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("skycast.json");
    std::fs::write(
        &config_path,
        r#"{"data": {"path": "from_file.csv"}, "training": {"batch_size": 16}}"#,
    )
    .unwrap();

    let config_arg = config_path.to_str().unwrap();
    let cli = Cli::parse_from(["skycast", "--config", config_arg]);
    let config = cli.global.pipeline_config().unwrap();
    assert_eq!(config.data.path, PathBuf::from("from_file.csv"));
    assert_eq!(config.training.batch_size, 16);

    let cli = Cli::parse_from(["skycast", "--config", config_arg, "--data", "flag.csv"]);
    let config = cli.global.pipeline_config().unwrap();
    assert_eq!(config.data.path, PathBuf::from("flag.csv"));
}

#[test]
fn bad_config_file_is_reported() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("broken.json");
    std::fs::write(&config_path, "{ not json").unwrap();
    let cli = Cli::parse_from(["skycast", "--config", config_path.to_str().unwrap()]);
    let err = cli.global.pipeline_config().unwrap_err();
    assert!(err.to_string().contains("Failed to parse config JSON"));
}

#[test]
fn synthesize_then_train() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("history.csv");
    let out = dir.path().join("models");
    let data_arg = data.to_str().unwrap();
    let out_arg = out.to_str().unwrap();

    Cli::parse_from(["skycast", "synthesize", "--rows", "150", "--out", data_arg])
        .run()
        .unwrap();
    assert!(data.exists());

    Cli::parse_from(["skycast", "--data", data_arg, "preview", "-n", "2"])
        .run()
        .unwrap();

    Cli::parse_from([
        "skycast",
        "--data",
        data_arg,
        "--output-dir",
        out_arg,
        "train",
        "--epochs",
        "3",
    ])
    .run()
    .unwrap();
    assert!(out.join("weather_model.bin").exists());
    assert!(out.join("scaler.json").exists());
}

#[test]
fn missing_input_fails_with_context() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("nope.csv");
    let err = Cli::parse_from(["skycast", "--data", data.to_str().unwrap(), "train"])
        .run()
        .unwrap_err();
    assert!(format!("{:#}", err).contains("nope.csv"));
}
