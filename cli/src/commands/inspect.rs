use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};

use slug_emulator::rom::ROM_MAGIC;
use slug_emulator::Rom;

#[derive(Parser, Debug)]
pub struct InspectOpt {
    /// ROM image to inspect (.slug)
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    rom: Utf8PathBuf,
}

impl InspectOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let rom = Rom::load(&self.rom)?;

        let magic = rom.magic();
        let valid = if magic == ROM_MAGIC { "ok" } else { "INVALID" };
        println!("magic:            {magic:#010x} ({valid})");
        println!("setup entry:      {:#06x}", rom.setup_entry());
        println!("loop entry:       {:#06x}", rom.loop_entry());
        println!("data source:      {:#06x}", rom.data_source());
        println!("data destination: {:#06x}", rom.data_destination());
        println!("data size:        {} bytes", rom.data_size());

        Ok(())
    }
}
