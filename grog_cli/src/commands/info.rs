use crate::commands::common_args::*;
use clap::Parser;
use grog_emul::{AddressingMode, InsnKind, REGISTER_COUNT};
use strum::IntoEnumIterator;

#[derive(Parser)]
#[command(name = "info", about = "Show the machine layout and instruction set")]
pub struct InfoCmd {
    #[clap(flatten, next_help_heading = "Grog Options")]
    grog_options: GrogOptions,
}

impl InfoCmd {
    pub fn run(self) -> anyhow::Result<()> {
        let platform = self.grog_options.platform();
        eprintln!("Grog Virtual Machine");
        eprintln!("--------------------");
        eprintln!("{REGISTER_COUNT} registers");
        eprintln!("{} addressable bytes in memory", platform.memory_size);
        eprintln!("console on device {}", platform.console_device);
        if let Some(steps) = platform.max_steps {
            eprintln!("step budget: {steps}");
        }

        eprintln!();
        eprintln!("{:<6} {:<7} {:<9} {:<8} length", "opcode", "insn", "category", "format");
        for kind in InsnKind::iter() {
            let format = kind.format();
            let lengths = if format.takes_mode() {
                AddressingMode::iter()
                    .map(|mode| format!("{mode}={}", format.length(mode)))
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                format.length(AddressingMode::Immediate).to_string()
            };
            eprintln!(
                "0x{:02x}   {:<7} {:<9} {:<8} {lengths}",
                kind.opcode(),
                kind.to_string(),
                format!("{:?}", kind.category()),
                format!("{format:?}"),
            );
        }
        Ok(())
    }
}
