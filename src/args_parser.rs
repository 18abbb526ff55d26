use clap::Parser;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(short, long, default_value_t = String::from("scenario.yaml"))]
    pub infile: String,

    /// Overrides the step count in the scenario file
    #[arg(short, long)]
    pub steps: Option<usize>,

    /// Print a row every this many steps
    #[arg(short, long, default_value_t = 100)]
    pub every: usize,
}
