use aerostruct_rbf::{
    modal_assurance_criterion, point_cloud_to_csv, progress::closure_sink, transfer_displacement,
    transfer_load, transfer_modes, virtual_work, BoundaryConditionMask, InterpolationOperator,
    InterpolationSettings, KernelType, OperatorCache,
};
use faer::Mat;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let semi_span = 10.0;
    let chord = 2.0;

    // Structural nodes on the front and rear spars of a flat wing box
    let spar_stations = 21usize;
    let structure = Mat::from_fn(2 * spar_stations, 3, |i, j| {
        let station = (i % spar_stations) as f64 / (spar_stations - 1) as f64;
        match j {
            0 => if i < spar_stations { 0.25 * chord } else { 0.7 * chord },
            1 => station * semi_span,
            _ => 0.0,
        }
    });

    // Aerodynamic surface points on the upper and lower skins
    let (n_chord, n_span) = (12usize, 30usize);
    let per_skin = n_chord * n_span;
    let aero = Mat::from_fn(2 * per_skin, 3, |i, j| {
        let k = i % per_skin;
        let x = (k % n_chord) as f64 / (n_chord - 1) as f64;
        let y = (k / n_chord) as f64 / (n_span - 1) as f64;
        match j {
            0 => x * chord,
            1 => y * semi_span,
            _ => if i < per_skin { 0.06 } else { -0.06 },
        }
    });

    // Ignore the thickness direction so both skins follow the wing box
    let settings = InterpolationSettings::builder(KernelType::ThinPlate)
        .bias([1.0, 1.0, 0.0])
        .build();

    let (sink, listener) = closure_sink(64, |msg| println!("{msg:?}"));
    let cache = OperatorCache::new().progress_callback(sink);

    let operator = cache.get_or_build(structure.as_ref(), aero.as_ref(), &settings)?;
    // The second coupling iteration reuses the same operator
    let operator = cache.get_or_build(structure.as_ref(), aero.as_ref(), &settings)?;
    println!(
        "H is {} x {}, epsilon = {:?}",
        operator.num_target(),
        operator.num_source(),
        operator.epsilon()
    );

    // Quadratic bending plus a linear twist about the mid-chord line
    let displacement = Mat::from_fn(structure.nrows(), 3, |i, j| {
        let y = structure[(i, 1)] / semi_span;
        let x = structure[(i, 0)] - 0.5 * chord;
        if j == 2 { 0.5 * y * y - 0.05 * y * x } else { 0.0 }
    });
    let aero_displacement = transfer_displacement(&operator, displacement.as_ref())?;

    // Unit lift spread evenly over both skins
    let aero_force = Mat::from_fn(aero.nrows(), 3, |i, j| {
        if j == 2 { 1.0 / aero.nrows() as f64 } else { 0.0 }
    });
    let structural_force = transfer_load(&operator, aero_force.as_ref())?;

    let aero_work = virtual_work(aero_displacement.as_ref(), aero_force.as_ref())?;
    let structural_work = virtual_work(displacement.as_ref(), structural_force.as_ref())?;
    println!("virtual work: aero {aero_work:.12}, structure {structural_work:.12}");

    // Two structural modes, three dofs each, clamped at the root
    let modes = Mat::from_fn(structure.nrows(), 6, |i, c| {
        let y = structure[(i, 1)] / semi_span;
        let x = structure[(i, 0)] - 0.5 * chord;
        match c {
            2 => y * y,
            5 => x * y,
            _ => 0.0,
        }
    });
    let mut mask = BoundaryConditionMask::all_free(aero.nrows(), 3);
    for node in 0..aero.nrows() {
        if aero[(node, 1)] == 0.0 {
            for dof in 0..3 {
                mask.constrain(node, dof)?;
            }
        }
    }
    let aero_modes = transfer_modes(&operator, modes.as_ref(), &mask, 2)?;

    let heave = Mat::from_fn(aero.nrows(), 2, |i, c| aero_modes[(i, 3 * c + 2)]);
    let mac = modal_assurance_criterion(heave.as_ref(), heave.as_ref())?;
    println!("MAC between transferred bending and torsion: {:.4}", mac[(0, 1)]);

    let dir = std::env::temp_dir();
    let operator_path = dir.join("wing_transfer_operator.json");
    operator.save(&operator_path)?;
    let reloaded = InterpolationOperator::load(&operator_path)?;
    println!("reloaded operator with {} target points", reloaded.num_target());

    let deformed = &aero + &aero_displacement;
    point_cloud_to_csv(deformed.as_ref(), dir.join("wing_transfer_deformed.csv"))?;

    drop(cache);
    let _ = listener.join();

    Ok(())
}
