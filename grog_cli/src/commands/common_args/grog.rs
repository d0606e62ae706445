use clap::Args;
use grog_emul::{GROG_PLATFORM, MEMORY_SIZE, Platform};

/// Grog machine options
#[derive(Clone, Args)]
pub struct GrogOptions {
    /// Number of addressable bytes of memory.
    #[arg(long, default_value_t = MEMORY_SIZE, value_parser = clap::value_parser!(u32).range(1..=MEMORY_SIZE as i64))]
    pub memory_size: u32,

    /// Stop with a fault after this many executed instructions.
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Print the register file to stderr once the machine stops.
    #[arg(long)]
    pub dump_registers: bool,

    /// Raise the log level; repeat for more (`-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GrogOptions {
    /// Try set up the logger based on the verbosity level
    pub fn try_setup_logger(&self) {
        use tracing_subscriber::{
            EnvFilter, Registry, filter::LevelFilter, fmt, layer::SubscriberExt,
            util::SubscriberInitExt,
        };

        let level = match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        // RUST_LOG still wins over the flag.
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let fmt_layer = fmt::layer()
            .compact()
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .without_time();

        Registry::default()
            .with(fmt_layer)
            .with(filter)
            .try_init()
            .ok();
    }

    pub fn platform(&self) -> Platform {
        GROG_PLATFORM
            .with_memory_size(self.memory_size)
            .with_max_steps(self.max_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[clap(flatten)]
        options: GrogOptions,
    }

    #[test]
    fn test_defaults_match_platform() {
        let cli = TestCli::parse_from(["grog"]);
        assert_eq!(cli.options.platform(), GROG_PLATFORM);
        assert!(!cli.options.dump_registers);
        assert_eq!(cli.options.verbose, 0);
    }

    #[test]
    fn test_overrides() {
        let cli = TestCli::parse_from([
            "grog",
            "--memory-size",
            "256",
            "--max-steps",
            "1000",
            "-vv",
        ]);
        let platform = cli.options.platform();
        assert_eq!(platform.memory_size, 256);
        assert_eq!(platform.max_steps, Some(1000));
        assert_eq!(cli.options.verbose, 2);
    }

    #[test]
    fn test_memory_size_bounds() {
        assert!(TestCli::try_parse_from(["grog", "--memory-size", "0"]).is_err());
        assert!(TestCli::try_parse_from(["grog", "--memory-size", "65537"]).is_err());
    }
}
