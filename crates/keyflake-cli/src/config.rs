use anyhow::bail;
use clap::{Args, Parser, Subcommand, ValueEnum};
use keyflake::{ClockRegression, KeyflakeId};

/// Upper bound on `--threads`; one generator serializes all of them anyway.
pub const MAX_THREADS: usize = 256;

/// Command-line interface of the `keyflake` binary.
///
/// Options are parsed from CLI arguments or environment variables (a `.env`
/// file in the working directory is loaded first). Without a subcommand the
/// top-level options are those of `generate`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "keyflake",
    version,
    about = "Generate and inspect Snowflake-style 64-bit IDs",
    args_conflicts_with_subcommands = true
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub generate: GenerateArgs,
}

impl CliArgs {
    /// The command to run, falling back to `generate`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Generate(self.generate))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate new IDs and print one per line (the default).
    Generate(GenerateArgs),
    /// Decode existing IDs into their components.
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Machine ID stamped into every generated ID (0-15).
    ///
    /// Each process generating IDs in the same namespace must use a distinct
    /// value; nothing here coordinates that.
    ///
    /// Environment variable: `MACHINE_ID`
    #[arg(long, env = "MACHINE_ID")]
    pub machine_id: Option<u64>,

    /// Number of IDs to generate.
    ///
    /// Environment variable: `ID_COUNT`
    #[arg(short = 'n', long, env = "ID_COUNT", default_value_t = 1)]
    pub count: usize,

    /// Number of threads sharing the generator.
    ///
    /// IDs are still drawn from a single generator instance. Under the `wait`
    /// regression policy the output is sorted, which is issue order; under
    /// `tolerate` it is grouped per thread.
    ///
    /// Environment variable: `ID_THREADS`
    #[arg(long, env = "ID_THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Time source driving the timestamp field.
    ///
    /// Environment variable: `ID_CLOCK`
    #[arg(long, env = "ID_CLOCK", value_enum, default_value_t = ClockKind::Wall)]
    pub clock: ClockKind,

    /// What to do when the clock moves backward.
    ///
    /// Environment variable: `ON_CLOCK_REGRESSION`
    #[arg(long, env = "ON_CLOCK_REGRESSION", value_enum, default_value_t = RegressionPolicy::Wait)]
    pub on_regression: RegressionPolicy,

    /// Output format.
    ///
    /// Environment variable: `ID_FORMAT`
    #[arg(long, env = "ID_FORMAT", value_enum, default_value_t = OutputFormat::Decimal)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Raw IDs to decode.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<u64>,

    /// Print one JSON object per ID instead of the layout table.
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// System wall clock, read on every call.
    Wall,
    /// Wall clock anchored once, then advanced by a monotonic timer.
    Monotonic,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionPolicy {
    /// Stall until the clock catches up; IDs stay increasing.
    Wait,
    /// Reset the sequence and keep going; IDs may go backward.
    Tolerate,
}

impl From<RegressionPolicy> for ClockRegression {
    fn from(policy: RegressionPolicy) -> Self {
        match policy {
            RegressionPolicy::Wait => Self::Wait,
            RegressionPolicy::Tolerate => Self::Tolerate,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain decimal.
    Decimal,
    /// Zero-padded 20-digit decimal, sorts lexicographically.
    Padded,
    /// One JSON object per line with decoded fields.
    Json,
}

/// Validated settings for `keyflake generate`.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub machine_id: u64,
    pub count: usize,
    pub threads: usize,
    pub clock: ClockKind,
    pub policy: ClockRegression,
    pub format: OutputFormat,
}

impl TryFrom<GenerateArgs> for GenerateConfig {
    type Error = anyhow::Error;

    fn try_from(args: GenerateArgs) -> Result<Self, Self::Error> {
        let max_machine_id = KeyflakeId::max_machine_id();

        let Some(machine_id) = args.machine_id else {
            bail!("MACHINE_ID is required (pass --machine-id or set MACHINE_ID)");
        };

        if machine_id > max_machine_id {
            bail!(
                "MACHINE_ID ({}) exceeds the machine ID space (max = {})",
                machine_id,
                max_machine_id
            );
        }

        if args.count == 0 {
            bail!("ID_COUNT must be greater than 0");
        }

        if args.threads == 0 || args.threads > MAX_THREADS {
            bail!(
                "ID_THREADS ({}) must be between 1 and {}",
                args.threads,
                MAX_THREADS
            );
        }

        Ok(Self {
            machine_id,
            count: args.count,
            // Never spawn threads that would have nothing to do.
            threads: args.threads.min(args.count),
            clock: args.clock,
            policy: args.on_regression.into(),
            format: args.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GenerateArgs {
        GenerateArgs {
            machine_id: Some(5),
            count: 10,
            threads: 2,
            clock: ClockKind::Wall,
            on_regression: RegressionPolicy::Wait,
            format: OutputFormat::Decimal,
        }
    }

    #[test]
    fn accepts_valid_arguments() {
        let config = GenerateConfig::try_from(args()).unwrap();
        assert_eq!(config.machine_id, 5);
        assert_eq!(config.count, 10);
        assert_eq!(config.threads, 2);
        assert_eq!(config.policy, ClockRegression::Wait);
    }

    #[test]
    fn accepts_machine_id_bounds() {
        for machine_id in [0, 15] {
            let config = GenerateConfig::try_from(GenerateArgs {
                machine_id: Some(machine_id),
                ..args()
            })
            .unwrap();
            assert_eq!(config.machine_id, machine_id);
        }
    }

    #[test]
    fn rejects_machine_id_out_of_range() {
        let err = GenerateConfig::try_from(GenerateArgs {
            machine_id: Some(16),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("MACHINE_ID (16)"));
    }

    #[test]
    fn rejects_missing_machine_id() {
        let err = GenerateConfig::try_from(GenerateArgs {
            machine_id: None,
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("MACHINE_ID is required"));
    }

    #[test]
    fn rejects_zero_count_and_threads() {
        assert!(GenerateConfig::try_from(GenerateArgs { count: 0, ..args() }).is_err());
        assert!(GenerateConfig::try_from(GenerateArgs { threads: 0, ..args() }).is_err());
        assert!(
            GenerateConfig::try_from(GenerateArgs {
                threads: MAX_THREADS + 1,
                ..args()
            })
            .is_err()
        );
    }

    #[test]
    fn caps_threads_at_count() {
        let config = GenerateConfig::try_from(GenerateArgs {
            count: 3,
            threads: 8,
            ..args()
        })
        .unwrap();
        assert_eq!(config.threads, 3);
    }

    #[test]
    fn maps_regression_policy() {
        let config = GenerateConfig::try_from(GenerateArgs {
            on_regression: RegressionPolicy::Tolerate,
            ..args()
        })
        .unwrap();
        assert_eq!(config.policy, ClockRegression::Tolerate);
    }

    #[test]
    fn parses_generate_command_line() {
        let cli = CliArgs::try_parse_from([
            "keyflake",
            "generate",
            "--machine-id",
            "7",
            "-n",
            "4",
            "--clock",
            "monotonic",
            "--format",
            "json",
        ])
        .unwrap();

        let Some(Command::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.machine_id, Some(7));
        assert_eq!(args.count, 4);
        assert_eq!(args.clock, ClockKind::Monotonic);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn parses_inspect_command_line() {
        let cli = CliArgs::try_parse_from(["keyflake", "inspect", "--json", "1", "65536"]).unwrap();

        let Command::Inspect(args) = cli.into_command() else {
            panic!("expected inspect");
        };
        assert!(args.json);
        assert_eq!(args.ids, [1, 65_536]);
    }

    #[test]
    fn generate_is_the_default_command() {
        let cli = CliArgs::try_parse_from(["keyflake", "--machine-id", "3", "-n", "2"]).unwrap();
        assert!(cli.command.is_none());

        let Command::Generate(args) = cli.into_command() else {
            panic!("expected generate");
        };
        assert_eq!(args.machine_id, Some(3));
        assert_eq!(args.count, 2);

        let config = GenerateConfig::try_from(args).unwrap();
        assert_eq!(config.machine_id, 3);
        assert_eq!(config.count, 2);
    }

    #[test]
    fn top_level_options_conflict_with_subcommand() {
        assert!(CliArgs::try_parse_from(["keyflake", "--machine-id", "3", "inspect", "1"]).is_err());
    }
}
