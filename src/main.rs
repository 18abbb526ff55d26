mod args_parser;

use clap::Parser;

use kinetica::model::StepReport;
use kinetica::readers::scenario::ScenarioConfig;

use crate::args_parser::Args;

fn print_row(report: &StepReport, n_atoms: usize) {
    println!(
        "{:>8} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>10.4} {:>4}",
        report.step,
        report.potential.total(),
        report.potential.per_particle(n_atoms),
        report.kinetic,
        report.total_energy(),
        report.temperature,
        report.reactions.formed + report.reactions.broken + report.reactions.substituted
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = ScenarioConfig::load(&args.infile)?;
    let mut model = config.build()?;
    let steps = args.steps.unwrap_or(config.engine.steps);
    let every = args.every.max(1);
    log::info!("running {steps} steps from {}", args.infile);

    println!(
        "{:>8} {:>12} {:>12} {:>12} {:>12} {:>10} {:>4}",
        "step", "potential", "pe/atom", "kinetic", "total", "temp", "rx"
    );
    let potential = model.compute_force(model.time());
    print_row(
        &StepReport {
            step: 0,
            time: model.time(),
            potential,
            kinetic: model.kinetic_energy(),
            temperature: model.temperature(),
            neighbour_rebuilt: false,
            reactions: Default::default(),
        },
        model.atoms.n_live(),
    );
    for step in 1..=steps {
        let report = model.advance(step);
        if step % every == 0 || step == steps {
            print_row(&report, model.atoms.n_live());
        }
    }
    Ok(())
}
