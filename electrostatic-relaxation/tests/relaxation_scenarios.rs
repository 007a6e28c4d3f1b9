//! End-to-end behaviour of the relaxation engine on the electrode and
//! charge problems.

use approx::assert_abs_diff_eq;
use electrostatic_relaxation::{
    gauss_seidel_sweep, jacobi_sweep, max_abs_diff, solve_laplace, solve_poisson, Boundary,
    Charge, Grid, Placement, RelaxError, Solver, SolverParams,
};

mod common;
use common::{all_schemes, laplace_solver, mirror_defect, reference_gauss_seidel, reference_jacobi};

#[test]
fn boundary_holds_after_every_sweep() {
    for (name, params) in all_schemes() {
        let mut solver = laplace_solver(10, params.with_tolerance(1e-6));
        while !solver.is_converged() {
            solver.step().unwrap();
            assert!(
                solver.boundary().holds(&solver.potential().phi),
                "{name}: fixed node overwritten at iteration {}",
                solver.iteration()
            );
        }
    }
}

#[test]
fn observer_sees_boundary_intact() {
    let mut checked = 0;
    let solution = laplace_solver(16, SolverParams::sor(1.7).with_report_every(1))
        .run_with_observer(|progress| {
            assert!(Boundary::electrodes().holds(&progress.potential.phi));
            checked += 1;
        })
        .unwrap();
    assert_eq!(checked, solution.iterations);
}

#[test]
fn stops_at_first_delta_within_tolerance() {
    let tolerance = 1e-5;
    for (name, params) in all_schemes() {
        let solution = solve_laplace(12, params.with_tolerance(tolerance)).unwrap();
        let (last, earlier) = solution.history.split_last().unwrap();

        assert!(solution.converged, "{name} did not converge");
        assert_eq!(solution.history.len(), solution.iterations);
        assert_eq!(*last, solution.delta);
        assert!(*last <= tolerance);
        assert!(
            earlier.iter().all(|&d| d > tolerance),
            "{name} kept iterating after reaching the tolerance"
        );
    }
}

#[test]
fn capped_poisson_run_reports_last_delta() {
    let grid = Grid::new(20, 20, 1.0).unwrap();
    let charges = [Charge::new(5, 10, 2, 1.0)];
    let solution = solve_poisson(
        grid,
        &charges,
        SolverParams::jacobi().with_tolerance(1e-12).with_max_iter(25),
    )
    .unwrap();

    assert_eq!(solution.iterations, 25);
    assert!(!solution.converged);
    assert!(solution.delta > 1e-12);
    assert_eq!(solution.history.last(), Some(&solution.delta));
}

#[test]
fn unit_factor_matches_plain_updates() {
    let grid = Grid::square(10, 1.0).unwrap();
    let boundary = Boundary::electrodes();
    let fixed = boundary.fixed_mask(grid.rows, grid.cols);

    // Start from a field that has already moved off the initial stamp.
    let mut warm = Solver::laplace(grid, SolverParams::jacobi()).unwrap();
    for _ in 0..3 {
        warm.step().unwrap();
    }
    let start = warm.potential().phi.clone();

    let mut jacobi = start.clone();
    jacobi_sweep(&start, &mut jacobi, &fixed, None, grid.h, 1.0);
    boundary.apply(&mut jacobi).unwrap();
    let mut expected = reference_jacobi(&start, boundary);
    boundary.apply(&mut expected).unwrap();
    assert_abs_diff_eq!(jacobi, expected, epsilon = 1e-15);

    let mut gauss_seidel = start.clone();
    gauss_seidel_sweep(&mut gauss_seidel, &fixed, None, grid.h, 1.0);
    boundary.apply(&mut gauss_seidel).unwrap();
    let mut expected = reference_gauss_seidel(&start, boundary);
    boundary.apply(&mut expected).unwrap();
    assert_abs_diff_eq!(gauss_seidel, expected, epsilon = 1e-15);

    // Same through the solver, one SOR sweep at omega = 1 from the stamp.
    let initial = laplace_solver(10, SolverParams::sor(1.0)).potential().phi.clone();
    let mut sor = laplace_solver(10, SolverParams::sor(1.0));
    sor.step().unwrap();
    let mut expected = reference_gauss_seidel(&initial, boundary);
    boundary.apply(&mut expected).unwrap();
    assert_abs_diff_eq!(sor.potential().phi, expected, epsilon = 1e-15);
}

#[test]
fn gauss_seidel_is_not_jacobi() {
    let mut jacobi = laplace_solver(10, SolverParams::jacobi());
    let mut gauss_seidel = laplace_solver(10, SolverParams::gauss_seidel());
    jacobi.step().unwrap();
    jacobi.step().unwrap();
    gauss_seidel.step().unwrap();
    gauss_seidel.step().unwrap();
    assert!(max_abs_diff(&jacobi.potential().phi, &gauss_seidel.potential().phi) > 1e-3);
}

#[test]
fn small_grid_electrodes_are_antisymmetric() {
    // N = 4: electrodes at columns 1 and 3, rows 1..=3.
    for (name, params) in all_schemes() {
        let solution = solve_laplace(4, params).unwrap();
        let phi = &solution.potential.phi;
        for i in 1..=3 {
            assert_eq!(phi[[i, 1]], 1.0, "{name}");
            assert_eq!(phi[[i, 3]], -1.0, "{name}");
        }
        let plus = solution.potential.column(1).to_owned();
        let minus = solution.potential.column(3).to_owned();
        assert_eq!(plus, -minus, "{name}");
        assert_abs_diff_eq!(mirror_defect(phi), 0.0, epsilon = 1e-12);
    }
}

#[test]
fn sor_converges_quickly_within_electrode_bounds() {
    let solution = solve_laplace(10, SolverParams::sor(1.5).with_tolerance(1e-4)).unwrap();
    assert!(solution.converged);
    assert!(solution.iterations > 0 && solution.iterations < 2000);
    assert!(solution.potential.max_abs() <= 1.0);
    assert_eq!(solution.potential.max_abs(), 1.0);
}

#[test]
fn every_scheme_respects_maximum_principle() {
    for (name, params) in all_schemes() {
        let solution = solve_laplace(10, params.with_tolerance(1e-4)).unwrap();
        assert!(solution.iterations < 2000, "{name}");
        assert!(solution.potential.max_abs() <= 1.0, "{name}");
        assert!(mirror_defect(&solution.potential.phi) < 1e-2, "{name}");
    }
}

#[test]
fn schemes_agree_on_the_converged_field() {
    let tight = 1e-8;
    let jacobi = solve_laplace(10, SolverParams::jacobi().with_tolerance(tight)).unwrap();
    let sor = solve_laplace(10, SolverParams::sor(1.6).with_tolerance(tight)).unwrap();
    assert_abs_diff_eq!(jacobi.potential.phi, sor.potential.phi, epsilon = 1e-5);
}

#[test]
fn over_relaxation_needs_fewest_sweeps() {
    // Under the max-change stopping rule plain Gauss-Seidel is not faster
    // than Jacobi here, so only the over-relaxed sweep is ranked.
    let tolerance = 1e-5;
    let jacobi = solve_laplace(20, SolverParams::jacobi().with_tolerance(tolerance)).unwrap();
    let gs = solve_laplace(20, SolverParams::gauss_seidel().with_tolerance(tolerance)).unwrap();
    let sor = solve_laplace(20, SolverParams::sor(1.7).with_tolerance(tolerance)).unwrap();
    assert!(jacobi.converged && gs.converged && sor.converged);
    assert!(sor.iterations < gs.iterations);
    assert!(sor.iterations < jacobi.iterations);
}

#[test]
fn point_charges_pull_the_potential_their_way() {
    let grid = Grid::new(20, 20, 1.0).unwrap();
    let charges = [Charge::new(5, 10, 2, 1.0), Charge::new(15, 10, 2, -1.0)];
    let solution = solve_poisson(grid, &charges, SolverParams::sor(1.5)).unwrap();

    assert!(solution.converged);
    assert!(solution.delta <= 1e-5);
    let phi = &solution.potential.phi;
    assert!(phi[[10, 5]] > 0.0);
    assert!(phi[[10, 15]] < 0.0);
    assert!(Boundary::grounded().holds(phi));
    // The two squares mirror each other about the vertical centre line.
    assert!(mirror_defect(phi) < 1e-3);
}

#[test]
fn finer_spacing_weakens_the_source() {
    let charges = [Charge::new(10, 10, 3, 1.0)];
    let coarse = solve_poisson(Grid::square(20, 1.0).unwrap(), &charges, SolverParams::sor(1.6))
        .unwrap();
    let fine = solve_poisson(Grid::square(20, 0.5).unwrap(), &charges, SolverParams::sor(1.6))
        .unwrap();
    let peak_coarse = coarse.potential.phi[[10, 10]];
    let peak_fine = fine.potential.phi[[10, 10]];
    assert!(peak_coarse > 0.0);
    // The source enters as h^2 * rho, so halving h quarters the solution.
    assert_abs_diff_eq!(peak_fine, peak_coarse / 4.0, epsilon = 1e-3);
}

#[test]
fn truncated_placement_moves_the_electrode() {
    let grid = Grid::square(9, 1.0).unwrap();
    let params = SolverParams::sor(1.5);
    let rounded = Solver::new(grid, Boundary::Electrodes(Placement::Round), None, params)
        .unwrap()
        .run()
        .unwrap();
    let truncated = Solver::new(grid, Boundary::Electrodes(Placement::Truncate), None, params)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(rounded.potential.phi[[5, 2]], 1.0);
    assert_eq!(truncated.potential.phi[[5, 1]], 1.0);
    assert_ne!(truncated.potential.phi[[5, 2]], 1.0);
}

#[test]
fn invalid_inputs_fail_before_any_sweep() {
    assert_eq!(
        solve_laplace(1, SolverParams::sor(1.5)).unwrap_err(),
        RelaxError::InvalidGridShape { rows: 2, cols: 2 }
    );
    assert_eq!(
        solve_laplace(10, SolverParams::sor(2.0)).unwrap_err(),
        RelaxError::InvalidRelaxationFactor(2.0)
    );
    assert_eq!(
        solve_laplace(10, SolverParams::sor(1.5).with_tolerance(0.0)).unwrap_err(),
        RelaxError::InvalidTolerance(0.0)
    );
}

#[test]
fn over_relaxed_jacobi_blowup_is_reported() {
    let err = solve_laplace(10, SolverParams::jacobi_sor(1.8).with_max_iter(100_000)).unwrap_err();
    assert!(matches!(err, RelaxError::NumericalDivergence { iteration } if iteration > 1));
}
