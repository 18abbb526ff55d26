use approx::assert_relative_eq;
use nalgebra::Vector2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use kinetica::atoms::new::AtomSpec;
use kinetica::atoms::properties::Selection;
use kinetica::bodies::BodySpec;
use kinetica::constants::Units;
use kinetica::ensemble::heat_bath::HeatBath;
use kinetica::errors::KineticaError;
use kinetica::math::cross;
use kinetica::model::atomic::AtomicModel;
use kinetica::model::meso::MesoModel;
use kinetica::model::shared::SharedModel;
use kinetica::model::ForceSwitches;
use kinetica::potentials::bonded::{AngularBond, RadialBond};
use kinetica::reactions::scheme::{ReactionScheme, SchemeEnergies};
use kinetica::reactions::ReactionEngine;
use kinetica::readers::scenario::ScenarioConfig;
use kinetica::simulation_box::{BoundaryMode, SimulationBox};
use kinetica::species::{Species, SpeciesId, SpeciesTable};

// builders

fn reduced_model(species: SpeciesTable, width: f64, mode: BoundaryMode) -> AtomicModel {
    let sim_box = SimulationBox::new(0.0, 0.0, width, width, mode).unwrap();
    AtomicModel::new(species, sim_box, Units::reduced()).with_seed(42)
}

fn argon(epsilon: f64) -> (SpeciesTable, SpeciesId) {
    let mut species = SpeciesTable::new();
    let ar = species.add(Species::new("Ar", 1.0, 1.0, epsilon)).unwrap();
    (species, ar)
}

/// Two radicals of species A flying at each other along x.
fn head_on_pair(bond_energy: f64, length_ratio: f64, stiffness: f64) -> AtomicModel {
    let mut species = SpeciesTable::new();
    let a = species.add(Species::new("A", 1.0, 1.0, 0.1)).unwrap();
    let b = species.add(Species::new("B", 1.0, 1.0, 0.1)).unwrap();
    let mut model = reduced_model(species, 20.0, BoundaryMode::Reflective);
    model.set_time_step(0.002).unwrap();
    model.set_switches(ForceSwitches {
        exclude_bonded: false,
        ..ForceSwitches::default()
    });
    model.add_atom(AtomSpec::new(a, 8.5, 10.0).with_velocity(1.0, 0.0)).unwrap();
    model.add_atom(AtomSpec::new(a, 11.5, 10.0).with_velocity(-1.0, 0.0)).unwrap();

    let energies = SchemeEnergies {
        first: bond_energy,
        stiffness,
        length_ratio,
        ..SchemeEnergies::default()
    };
    let scheme = ReactionScheme::a2_b2(a, b, energies).unwrap();
    model.set_reactions(Some(ReactionEngine::new(scheme)));
    model
}

/// Jittered square lattice of alternating charged species in a periodic box.
fn charged_gas(seed: u64) -> AtomicModel {
    let mut species = SpeciesTable::new();
    let plus = species
        .add(Species::new("P", 1.0, 1.0, 0.2).with_charge(0.3))
        .unwrap();
    let minus = species
        .add(Species::new("M", 1.5, 1.1, 0.1).with_charge(-0.3))
        .unwrap();
    let mut model = reduced_model(species, 10.0, BoundaryMode::Periodic);
    model.set_time_step(0.002).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    for ix in 0..6 {
        for iy in 0..6 {
            let species = if (ix + iy) % 2 == 0 { plus } else { minus };
            let x = 0.8 + 1.6 * ix as f64 + rng.gen_range(-0.15..0.15);
            let y = 0.8 + 1.6 * iy as f64 + rng.gen_range(-0.15..0.15);
            model.add_atom(AtomSpec::new(species, x, y)).unwrap();
        }
    }
    model
}

fn assert_forces_match(model: &mut AtomicModel) {
    let listed = model.compute_force(-1.0);
    let (brute, brute_forces) = model.compute_force_brute_force(-1.0);
    assert_relative_eq!(listed.lennard_jones, brute.lennard_jones, epsilon = 1e-9);
    assert_relative_eq!(listed.coulomb, brute.coulomb, epsilon = 1e-9);
    for i in 0..model.atoms.n_atoms {
        let diff = model.atoms.forces.column(i) - brute_forces.column(i);
        assert!(diff.norm() < 1e-9, "atom {i} differs by {}", diff.norm());
    }
}

// energy accounting

#[test]
fn closed_lattice_conserves_energy() {
    let (species, ar) = argon(1.0);
    let mut model = reduced_model(species, 7.2, BoundaryMode::Periodic);
    model.set_time_step(0.002).unwrap();
    model
        .add_lattice(ar, Vector2::new(0.6, 0.6), 6, 6, 1.2)
        .unwrap();
    model.assign_temperature(0.3).unwrap();

    let start = model.total_energy();
    let reports = model.run(1000);
    let n = model.atoms.n_live() as f64;
    for report in &reports {
        assert!(
            (report.total_energy() - start).abs() < 5e-3 * n,
            "step {} drifted to {}",
            report.step,
            report.total_energy()
        );
    }
}

#[test]
fn lone_atom_keeps_its_kinetic_energy() {
    let (species, ar) = argon(1.0);
    let mut model = reduced_model(species, 10.0, BoundaryMode::Periodic);
    model.set_time_step(0.01).unwrap();
    model
        .add_atom(AtomSpec::new(ar, 5.0, 5.0).with_velocity(3.0, -2.0))
        .unwrap();
    for report in model.run(500) {
        assert_relative_eq!(report.total_energy(), 6.5, epsilon = 1e-12);
    }
    assert!(model.boundary().contains(&model.atoms.position(0)));
}

// neighbour list

#[test]
fn neighbour_list_matches_brute_force() {
    let mut model = charged_gas(5);
    assert_forces_match(&mut model);

    model.assign_temperature(0.5).unwrap();
    for _ in 0..10 {
        model.run(20);
        assert_forces_match(&mut model);
    }
}

#[test]
fn minimum_image_crosses_the_boundary() {
    let (species, ar) = argon(0.1);
    let mut wrapped = reduced_model(species.clone(), 20.0, BoundaryMode::Periodic);
    wrapped.add_atom(AtomSpec::new(ar, 0.5, 10.0)).unwrap();
    wrapped.add_atom(AtomSpec::new(ar, 19.4, 10.0)).unwrap();

    let mut inside = reduced_model(species, 20.0, BoundaryMode::Periodic);
    inside.add_atom(AtomSpec::new(ar, 9.9, 10.0)).unwrap();
    inside.add_atom(AtomSpec::new(ar, 11.0, 10.0)).unwrap();

    let a = wrapped.compute_force(0.0);
    let b = inside.compute_force(0.0);
    assert!(a.lennard_jones < 0.0);
    assert_relative_eq!(a.lennard_jones, b.lennard_jones, epsilon = 1e-12);
    // the atom at x = 0.5 sits to the right of its partner's image
    let f_wrapped = wrapped.atoms.forces.column(0).into_owned();
    let f_inside = inside.atoms.forces.column(1).into_owned();
    assert_relative_eq!(f_wrapped, f_inside, epsilon = 1e-12);
}

// thermostat

#[test]
fn thermostat_is_idempotent_from_a_frozen_start() {
    let (species, ar) = argon(0.1);
    let mut model = reduced_model(species, 20.0, BoundaryMode::Reflective);
    model.add_lattice(ar, Vector2::new(2.0, 2.0), 4, 4, 2.0).unwrap();
    assert_eq!(model.temperature(), 0.0);

    model.set_temperature(0.7).unwrap();
    assert_relative_eq!(model.temperature(), 0.7, epsilon = 1e-12);
    let seeded = model.atoms.velocities.clone();

    model.set_temperature(0.7).unwrap();
    assert_relative_eq!(model.atoms.velocities, seeded, epsilon = 1e-12);

    model.set_temperature(0.0).unwrap();
    assert_eq!(model.kinetic_energy(), 0.0);
    model.set_temperature(0.0).unwrap();
    assert_eq!(model.kinetic_energy(), 0.0);
}

#[test]
fn assigned_velocities_carry_no_momentum() {
    let (species, ar) = argon(1.0);
    let mut model = reduced_model(species, 10.0, BoundaryMode::Periodic);
    model.set_time_step(0.002).unwrap();
    model.add_lattice(ar, Vector2::new(0.5, 0.5), 5, 5, 2.0).unwrap();
    model.assign_temperature(1.0).unwrap();
    assert_relative_eq!(model.temperature(), 1.0, epsilon = 1e-12);
    assert!(model.atoms.momentum().norm() < 1e-10);

    model.run(200);
    assert!(model.atoms.momentum().norm() < 1e-9);
}

#[test]
fn fixed_atoms_stay_put_and_cold() {
    let (species, ar) = argon(1.0);
    let mut model = reduced_model(species, 20.0, BoundaryMode::Reflective);
    model.set_time_step(0.002).unwrap();
    model.add_atom(AtomSpec::new(ar, 10.0, 10.0).fixed()).unwrap();
    model.add_atom(AtomSpec::new(ar, 11.2, 10.0)).unwrap();
    model.assign_temperature(2.0).unwrap();
    assert_eq!(model.atoms.velocity(0), Vector2::zeros());

    model.run(100);
    assert_eq!(model.atoms.position(0), Vector2::new(10.0, 10.0));
    assert_eq!(model.atoms.velocity(0), Vector2::zeros());
}

#[test]
fn fixed_atoms_are_left_out_of_selection_temperature() {
    let (species, ar) = argon(0.1);
    let mut model = reduced_model(species, 20.0, BoundaryMode::Reflective);
    model.add_atom(AtomSpec::new(ar, 4.0, 4.0).fixed()).unwrap();
    for x in [8.0, 12.0, 16.0] {
        model.add_atom(AtomSpec::new(ar, x, 10.0)).unwrap();
    }
    let all = Selection::all();
    model.set_temperature_of(1.0, &all).unwrap();
    assert_relative_eq!(model.temperature_of(&all), 1.0, epsilon = 1e-12);
    assert_relative_eq!(model.temperature_of(&all), model.temperature(), epsilon = 1e-12);
    assert_eq!(model.atoms.velocity(0), Vector2::zeros());
}

#[test]
fn pair_relaxes_under_a_cold_bath() {
    let (species, ar) = argon(0.1);
    let mut model = reduced_model(species, 20.0, BoundaryMode::Reflective);
    model.set_time_step(0.05).unwrap();
    model.add_atom(AtomSpec::new(ar, 10.0, 10.0)).unwrap();
    model.add_atom(AtomSpec::new(ar, 11.5, 10.0)).unwrap();

    model.advance(1);
    let f0 = model.atoms.forces.column(0).into_owned();
    let f1 = model.atoms.forces.column(1).into_owned();
    assert!(f0.x > 0.0);
    assert_relative_eq!(f0, -f1, epsilon = 1e-12);
    assert_eq!(f0.y, 0.0);

    model.set_heat_bath(Some(HeatBath::new(0.0, 5).unwrap()));
    model.run(400);
    let r = (model.atoms.position(1) - model.atoms.position(0)).norm();
    assert_relative_eq!(r, 2f64.powf(1.0 / 6.0), epsilon = 1e-3);
    assert!(model.heat_bath().unwrap().exchanged_energy < 0.0);
}

// bonds

#[test]
fn bonds_are_unique_and_angles_follow_them() {
    let (species, ar) = argon(0.1);
    let mut model = reduced_model(species, 20.0, BoundaryMode::Reflective);
    for (x, y) in [(10.0, 10.0), (11.0, 10.0), (10.0, 11.0)] {
        model.add_atom(AtomSpec::new(ar, x, y)).unwrap();
    }
    model.add_radial_bond(RadialBond::new(0, 1, 1.0, 10.0)).unwrap();
    assert!(matches!(
        model.add_radial_bond(RadialBond::new(1, 0, 1.0, 10.0)),
        Err(KineticaError::DuplicateBond { .. })
    ));
    assert!(matches!(
        model.add_radial_bond(RadialBond::new(2, 2, 1.0, 10.0)),
        Err(KineticaError::SelfBond { .. })
    ));
    let angle = AngularBond {
        i: 1,
        j: 2,
        vertex: 0,
        angle: std::f64::consts::FRAC_PI_2,
        stiffness: 2.0,
    };
    assert!(matches!(
        model.add_angular_bond(angle),
        Err(KineticaError::MissingRadialBond { .. })
    ));

    model.add_radial_bond(RadialBond::new(0, 2, 1.0, 10.0)).unwrap();
    model.add_angular_bond(angle).unwrap();
    assert_relative_eq!(model.potential_terms().angular_bond, 0.0, epsilon = 1e-12);

    let (_, dropped) = model.remove_radial_bond(2, 0).unwrap();
    assert_eq!(dropped, vec![angle]);
    assert!(model.bonds().angular().is_empty());
    assert_eq!(model.bonds().radial().len(), 1);
}

// reactions

#[test]
fn radicals_bond_when_the_energy_is_positive() {
    let mut model = head_on_pair(1.0, 1.0, 10.0);
    let formed = (1..=1000).find(|&step| model.advance(step).reactions.formed > 0);
    assert!(formed.is_some());
    assert!(!model.bonds().is_radical(0));
    assert!(!model.bonds().is_radical(1));
    assert_relative_eq!(model.bonds().radial()[0].chemical_energy, 1.0);
}

#[test]
fn radicals_never_bond_without_positive_energy() {
    for energy in [0.0, -0.5] {
        let mut model = head_on_pair(energy, 1.0, 10.0);
        for report in model.run(1000) {
            assert_eq!(report.reactions.formed, 0);
        }
        assert!(model.bonds().radial().is_empty());
    }
}

#[test]
fn reactions_conserve_total_energy() {
    let mut model = head_on_pair(1.0, 1.0, 10.0);
    let start = model.total_energy();
    let reports = model.run(1500);
    assert!(reports.iter().map(|r| r.reactions.formed).sum::<usize>() >= 1);
    for report in &reports {
        assert_relative_eq!(report.total_energy(), start, epsilon = 2e-3);
    }
}

#[test]
fn reactions_conserve_energy_with_bonded_exclusion() {
    let mut model = head_on_pair(1.0, 1.0, 10.0);
    model.set_switches(ForceSwitches::default());
    let start = model.total_energy();
    let reports = model.run(1500);
    assert!(reports.iter().map(|r| r.reactions.formed).sum::<usize>() >= 1);
    for report in &reports {
        assert_relative_eq!(report.total_energy(), start, epsilon = 1e-3);
    }
}

#[test]
fn rejected_reactions_leave_the_trajectory_untouched() {
    let mut reacting = head_on_pair(0.1, 0.5, 1000.0);
    let mut inert = head_on_pair(0.1, 0.5, 1000.0);
    inert.set_reactions(None);

    let mut rejected = 0;
    for step in 1..=1000 {
        rejected += reacting.advance(step).reactions.rejected;
        inert.advance(step);
    }
    assert!(rejected > 0);
    assert!(reacting.bonds().radial().is_empty());
    assert_eq!(reacting.atoms.velocities, inert.atoms.velocities);
    assert_eq!(reacting.atoms.positions, inert.atoms.positions);
}

// mesoscale

#[test]
fn gay_berne_all_pairs_conserve_angular_momentum() {
    let sim_box = SimulationBox::new(-20.0, -20.0, 40.0, 40.0, BoundaryMode::Open).unwrap();
    let mut model = MesoModel::new(sim_box, Units::reduced());
    let bodies = [
        BodySpec::new(0.0, 0.0, 0.2).with_charge(0.4),
        BodySpec::new(2.1, 0.7, 1.1).with_dipole(0.6),
        BodySpec::new(-0.8, 2.3, -0.5).with_well(1.5, 0.4),
        BodySpec::new(1.2, -2.4, 2.9).with_charge(-0.3).with_dipole(0.2),
    ];
    for spec in bodies {
        model.add_body(spec.with_shape(3.0, 1.0)).unwrap();
    }
    let terms = model.compute_force(0.0);
    assert!(terms.gay_berne != 0.0);

    let b = &model.bodies;
    let net_force = (0..4).fold(Vector2::zeros(), |f, i| f + b.forces.column(i));
    let net_torque: f64 = (0..4)
        .map(|i| b.torques[i] + cross(&b.position(i), &b.forces.column(i).into_owned()))
        .sum();
    assert!(net_force.norm() < 1e-9);
    assert!(net_torque.abs() < 1e-9);
}

#[test]
fn gay_berne_order_of_insertion_does_not_matter() {
    let sim_box = SimulationBox::new(-20.0, -20.0, 40.0, 40.0, BoundaryMode::Open).unwrap();
    let specs = [
        BodySpec::new(0.0, 0.0, 0.3),
        BodySpec::new(1.9, 0.4, 1.4),
        BodySpec::new(0.6, 2.0, -0.7),
    ];
    let mut forward = MesoModel::new(sim_box, Units::reduced());
    let mut backward = MesoModel::new(sim_box, Units::reduced());
    for spec in &specs {
        forward.add_body(spec.clone().with_shape(2.5, 1.0)).unwrap();
    }
    for spec in specs.iter().rev() {
        backward.add_body(spec.clone().with_shape(2.5, 1.0)).unwrap();
    }
    let a = forward.compute_force(0.0);
    let b = backward.compute_force(0.0);
    assert_relative_eq!(a.gay_berne, b.gay_berne, epsilon = 1e-12);
    for i in 0..3 {
        let j = 2 - i;
        assert_relative_eq!(
            forward.bodies.forces.column(i).into_owned(),
            backward.bodies.forces.column(j).into_owned(),
            epsilon = 1e-10
        );
        assert_relative_eq!(forward.bodies.torques[i], backward.bodies.torques[j], epsilon = 1e-10);
    }
}

// sharing

#[test]
fn shared_model_serialises_steps_across_threads() {
    let (species, ar) = argon(0.1);
    let mut model = reduced_model(species, 20.0, BoundaryMode::Reflective);
    model.set_time_step(0.01).unwrap();
    model.add_lattice(ar, Vector2::new(5.0, 5.0), 3, 3, 1.5).unwrap();
    let shared = SharedModel::new(model);

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let handle = shared.clone();
            std::thread::spawn(move || {
                for step in 1..=50 {
                    handle.advance(step);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_relative_eq!(shared.read(|m| m.time()), 1.0, epsilon = 1e-9);
}

// scenario files

#[test]
fn bundled_scenarios_load_and_run() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    for name in ["argon.yaml", "a2b2.yaml"] {
        let config = ScenarioConfig::load(dir.join(name)).unwrap();
        let mut model = config.build().unwrap();
        assert!(model.atoms.n_live() > 0);
        for report in model.run(20) {
            assert!(report.total_energy().is_finite(), "{name} blew up");
        }
    }
}
