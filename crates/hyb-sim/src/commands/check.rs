use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use hyb_mcmc::SimulationParams;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// YAML parameter file.
    #[arg(long)]
    pub params: PathBuf,
}

pub fn run(args: &CheckArgs) -> Result<(), Box<dyn Error>> {
    let params = SimulationParams::load(&args.params)?;
    params.validate()?;
    let channels = params.channels();
    println!(
        "{}: BETA={} N_ORBITALS={} SWEEPS={} THERMALIZATION={}",
        args.params.display(),
        params.beta,
        params.n_orbitals,
        params.sweeps,
        params.thermalization
    );
    let announcements = channels.announcements();
    if announcements.is_empty() {
        println!("no measurement channels enabled");
    }
    for line in announcements {
        println!("{line}");
    }
    for line in params.input_announcements() {
        println!("{line}");
    }
    Ok(())
}
