use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::info;

use slug_emulator::runtime::{Memory, NoInput, NoRenderer};
use slug_emulator::{Emulator, Rom, Scheduler};

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// ROM image to execute (.slug)
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    rom: Utf8PathBuf,

    /// Restore a previously saved machine state and skip the setup phase
    #[clap(long, value_parser, value_hint = ValueHint::FilePath)]
    load_state: Option<Utf8PathBuf>,

    /// Save the machine state to this file when the run ends
    #[clap(long, value_parser, value_hint = ValueHint::FilePath)]
    save_state: Option<Utf8PathBuf>,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.rom, "Loading ROM");
        let rom = Rom::load(&self.rom).context("could not load ROM image")?;

        // Headless collaborators: the emulated program still owns the
        // stdin/stdout/stderr ports, frames are dropped.
        let engine = Emulator::new(Memory::host());
        let mut scheduler = Scheduler::new(engine, NoRenderer, NoInput);

        let exit = if let Some(path) = &self.load_state {
            scheduler.engine_mut().start(&rom);
            scheduler
                .engine_mut()
                .load_state(path)
                .context("could not restore machine state")?;
            info!(%path, "Resuming from saved state");
            scheduler.run_loop()
        } else {
            scheduler.run(&rom)
        };

        info!(reason = ?exit, "Emulation finished");

        if let Some(path) = &self.save_state {
            scheduler
                .engine()
                .save_state(path)
                .context("could not save machine state")?;
            info!(%path, "Saved machine state");
        }

        Ok(())
    }
}
