use crate::{commands::common_args::*, utils::*};
use clap::Parser;
use grog_emul::VMState;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "run", about = "Run a Grog image")]
pub struct RunCmd {
    /// Path to the raw image, loaded at address 0
    image: PathBuf,
    #[clap(flatten, next_help_heading = "Grog Options")]
    grog_options: GrogOptions,
}

impl RunCmd {
    pub fn run(self) -> anyhow::Result<()> {
        self.grog_options.try_setup_logger();
        let platform = self.grog_options.platform();
        tracing::debug!("loading {} on {}", self.image.display(), platform);
        let mut vm = VMState::with_console(platform);
        vm.load_image_file(&self.image)?;
        print_cargo_message("Loaded", format_args!("{}", self.image.display()));

        let result = vm.run();
        if self.grog_options.dump_registers {
            eprintln!("{}", vm.register_dump());
        }
        let summary = result.inspect_err(|e| tracing::debug!("run failed: {e:#}"))?;
        print_cargo_message(
            "Halted",
            format_args!(
                "Halt and catch fire! pc={} after {} steps",
                summary.pc, summary.steps
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn run_image(image: &[u8], extra: &[&str]) -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(image)?;
        let path = file.path().to_string_lossy().into_owned();
        let args = ["run", path.as_str()].into_iter().chain(extra.iter().copied());
        RunCmd::try_parse_from(args)?.run()
    }

    #[test]
    fn test_normal_halt() {
        assert!(run_image(&[0x01, 0x00, 0x05, 0x00], &["--dump-registers"]).is_ok());
    }

    #[test]
    fn test_image_too_large() {
        let err = run_image(&[0x00; 8], &["--memory-size", "4"]).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_IMAGE_TOO_LARGE);
    }

    #[test]
    fn test_fault() {
        let err = run_image(&[0x3f], &[]).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAULT);
    }

    #[test]
    fn test_step_budget() {
        // JMP 0, forever.
        let err = run_image(&[0x60, 0x00, 0x00, 0x00], &["--max-steps", "50"]).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAULT);
    }

    #[test]
    fn test_missing_file() {
        let args = ["run", "/nonexistent/image.bin"];
        let err = RunCmd::try_parse_from(args).unwrap().run().unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }
}
