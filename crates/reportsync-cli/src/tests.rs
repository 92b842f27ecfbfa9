use super::*;

#[test]
fn parses_run_analytics_command() {
    let cli = Cli::try_parse_from(["reportsync-cli", "run", "analytics"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Run {
            report: ReportKind::Analytics
        }
    ));
}

#[test]
fn parses_run_best_selling_command() {
    let cli = Cli::try_parse_from(["reportsync-cli", "run", "best-selling"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Run {
            report: ReportKind::BestSelling
        }
    ));
}

#[test]
fn run_accepts_underscore_spelling() {
    let cli = Cli::try_parse_from(["reportsync-cli", "run", "best_selling"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Run {
            report: ReportKind::BestSelling
        }
    ));
}

#[test]
fn parses_list_command() {
    let cli = Cli::try_parse_from(["reportsync-cli", "list"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::List));
}

#[test]
fn run_rejects_unknown_report() {
    let err = Cli::try_parse_from(["reportsync-cli", "run", "inventory"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    assert!(err.to_string().contains("unknown report"));
}

#[test]
fn run_requires_a_report() {
    let err = Cli::try_parse_from(["reportsync-cli", "run"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["reportsync-cli"]).is_err());
}
