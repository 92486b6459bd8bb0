use anyhow::Result;
use clap::Parser;

use ticket_activity_export::cli::{Cli, normalize};
use ticket_activity_export::{runner, util};

fn main() -> Result<()> {
  env_logger::init();

  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  // Phase 1: normalize CLI + environment into the explicit configuration
  let cfg = normalize(cli)?;

  // Phase 2: run one export work unit (seeds or resumes the checkpoint)
  let status = runner::run_export(&cfg)?;

  // Phase 3: report the status body for the trigger surface
  println!("{}", serde_json::to_string_pretty(&status)?);
  Ok(())
}
