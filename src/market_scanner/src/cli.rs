use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which analysis to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// TQQQ 200-day envelope recommendation
    Tqqq,
    /// Volume surge / MA crossover / up-trend screen over both universes
    Potential,
    /// Weekly wave classification over both universes
    Wave,
    /// tqqq, potential and wave, in that order
    All,
}

impl RunMode {
    /// The concrete modes this selection expands to.
    pub fn expand(self) -> &'static [RunMode] {
        match self {
            RunMode::All => &[RunMode::Tqqq, RunMode::Potential, RunMode::Wave],
            RunMode::Tqqq => &[RunMode::Tqqq],
            RunMode::Potential => &[RunMode::Potential],
            RunMode::Wave => &[RunMode::Wave],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RunMode::Tqqq => "tqqq",
            RunMode::Potential => "potential",
            RunMode::Wave => "wave",
            RunMode::All => "all",
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Daily index screener and alerting")]
pub struct Cli {
    /// Analysis to run
    #[arg(long, value_enum)]
    pub run: Option<RunMode>,

    /// Create or migrate the database and exit (unless --run is also given)
    #[arg(long)]
    pub init_db: bool,

    /// Path to the app config (scanner.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the universe catalog; overrides `universes_path` from the config
    #[arg(long, value_name = "FILE")]
    pub universes: Option<PathBuf>,

    /// Run even on weekends
    #[arg(long)]
    pub force: bool,

    /// Print messages instead of storing and sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// `--run` defaults to `all` unless only `--init-db` was asked for.
    pub fn modes(&self) -> &'static [RunMode] {
        match (self.run, self.init_db) {
            (Some(mode), _) => mode.expand(),
            (None, true) => &[],
            (None, false) => RunMode::All.expand(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_mode() {
        let cli = Cli::try_parse_from(["market-scanner", "--run", "wave", "--dry-run"]).unwrap();
        assert_eq!(cli.run, Some(RunMode::Wave));
        assert!(cli.dry_run);
        assert_eq!(cli.modes(), &[RunMode::Wave]);
    }

    #[test]
    fn all_expands_in_order() {
        let cli = Cli::try_parse_from(["market-scanner", "--run", "all"]).unwrap();
        assert_eq!(cli.modes(), &[RunMode::Tqqq, RunMode::Potential, RunMode::Wave]);
    }

    #[test]
    fn init_db_alone_runs_nothing_else() {
        let cli = Cli::try_parse_from(["market-scanner", "--init-db"]).unwrap();
        assert!(cli.init_db);
        assert!(cli.modes().is_empty());

        let cli = Cli::try_parse_from(["market-scanner"]).unwrap();
        assert_eq!(cli.modes().len(), 3);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["market-scanner", "--run", "crypto"]).is_err());
    }

    #[test]
    fn config_paths() {
        let cli = Cli::try_parse_from([
            "market-scanner",
            "-c",
            "configs/scanner.toml",
            "--universes",
            "u.toml",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.config.unwrap(), PathBuf::from("configs/scanner.toml"));
        assert_eq!(cli.universes.unwrap(), PathBuf::from("u.toml"));
        assert!(cli.force);
    }
}
