use clap::Parser;

mod inspect;
mod run;

#[derive(Parser)]
pub enum Subcommand {
    /// Load a ROM image and run it headless
    Run(self::run::RunOpt),

    /// Print the header of a ROM image
    Inspect(self::inspect::InspectOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Subcommand::Run(opt) => opt.exec(),
            Subcommand::Inspect(opt) => opt.exec(),
        }
    }
}
