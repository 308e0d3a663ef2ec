//! End-to-end tests for fitting, evaluation and ranking

use als_recommender::{
    build_mask, fit, initialize_factors, objective, seeded_rng, top_n, weighted_error, AlsConfig,
    AlsSolver, ScoreTable, SolveStrategy,
};
use ndarray::{array, Array2};

fn movie_ratings() -> Array2<f64> {
    array![
        [5.0, 5.0, 5.0, 5.0, 1.0],
        [0.0, 0.0, 0.0, 4.0, 1.0],
        [1.0, 2.0, 3.0, 3.0, 1.0],
        [2.0, 2.0, 2.0, 1.0, 0.0],
        [5.0, 2.0, 5.0, 1.0, 0.0]
    ]
}

#[test]
fn test_single_iteration_scenario() {
    let q = movie_ratings();
    let w = build_mask(q.view());

    for strategy in [SolveStrategy::Weighted, SolveStrategy::Dense] {
        let solver = AlsSolver::new(
            AlsConfig::new(5, 1, 0.1)
                .with_seed(2024)
                .with_strategy(strategy),
        );
        let report = solver.fit(q.view()).unwrap();
        let q_hat = report.factors.reconstruct().unwrap();
        assert_eq!(q_hat.dim(), (5, 5));

        let error = weighted_error(
            w.view(),
            q.view(),
            &report.factors.user_factors,
            &report.factors.item_factors,
        )
        .unwrap();
        assert!(error.is_finite());
        assert!(error >= 0.0);
        assert!((error - report.weighted_error).abs() < 1e-9);
    }
}

#[test]
fn test_fit_entry_point_shapes() {
    let q = movie_ratings();
    let factors = fit(q.view(), 2, 3, 0.1).unwrap();

    assert_eq!(factors.user_factors.dim(), (5, 2));
    assert_eq!(factors.item_factors.dim(), (2, 5));
    assert_eq!(factors.reconstruct().unwrap().dim(), (5, 5));
}

// Each exact half-step minimizes J = E + λ(‖X‖² + ‖Y‖²), so J is what cannot
// rise between iterations; E alone may tick up while the penalty falls.
#[test]
fn test_weighted_objective_never_increases() {
    let q = movie_ratings();
    let w = build_mask(q.view());
    let lambda = 0.1;

    let (x0, y0) = initialize_factors(5, 5, 2, &mut seeded_rng(17)).unwrap();
    let initial_objective = objective(w.view(), q.view(), &x0, &y0, lambda).unwrap();
    let initial_error = weighted_error(w.view(), q.view(), &x0, &y0).unwrap();

    let solver = AlsSolver::new(AlsConfig::new(2, 15, lambda).with_progress(true));
    let report = solver.fit_from(q.view(), x0, y0).unwrap();
    assert_eq!(report.history.len(), 15);

    let mut previous = initial_objective;
    for stats in &report.history {
        let tolerance = 1e-9 * previous.max(1.0);
        assert!(
            stats.objective <= previous + tolerance,
            "objective rose from {} to {} at iteration {}",
            previous,
            stats.objective,
            stats.iteration
        );
        previous = stats.objective;
    }

    assert!(report.weighted_error < initial_error);
}

#[test]
fn test_zero_iterations_return_initial_factors() {
    let q = movie_ratings();

    let report = AlsSolver::new(AlsConfig::new(3, 0, 0.1).with_seed(21))
        .fit(q.view())
        .unwrap();
    let (x0, y0) = initialize_factors(5, 5, 3, &mut seeded_rng(21)).unwrap();

    assert_eq!(report.factors.user_factors, x0);
    assert_eq!(report.factors.item_factors, y0);
    assert_eq!(report.iterations, 0);

    let mut rng = seeded_rng(99);
    let injected = AlsSolver::new(AlsConfig::new(3, 0, 0.1))
        .fit_with_rng(q.view(), &mut rng)
        .unwrap();
    let (x1, y1) = initialize_factors(5, 5, 3, &mut seeded_rng(99)).unwrap();
    assert_eq!(injected.factors.user_factors, x1);
    assert_eq!(injected.factors.item_factors, y1);
}

#[test]
fn test_regularization_keeps_rank_deficient_input_solvable() {
    let constant = Array2::<f64>::from_elem((4, 6), 3.0);
    let zeros = Array2::<f64>::zeros((4, 6));

    for strategy in [SolveStrategy::Weighted, SolveStrategy::Dense] {
        for q in [&constant, &zeros] {
            let solver = AlsSolver::new(
                AlsConfig::new(4, 10, 0.1)
                    .with_seed(5)
                    .with_strategy(strategy),
            );
            let report = solver.fit(q.view()).unwrap();
            assert!(report.weighted_error.is_finite());
            assert!(report
                .factors
                .user_factors
                .iter()
                .chain(report.factors.item_factors.iter())
                .all(|v| v.is_finite()));
        }
    }
}

#[test]
fn test_tiny_regularization_keeps_constant_input_solvable() {
    let constant = Array2::<f64>::from_elem((4, 6), 3.0);

    for strategy in [SolveStrategy::Weighted, SolveStrategy::Dense] {
        for lambda in [1e-9, 1e-11] {
            let solver = AlsSolver::new(
                AlsConfig::new(4, 3, lambda)
                    .with_seed(5)
                    .with_strategy(strategy),
            );
            let report = solver.fit(constant.view()).unwrap_or_else(|e| {
                panic!("{} fit with lambda {} failed: {}", strategy, lambda, e)
            });
            assert!(report.weighted_error.is_finite());
        }
    }
}

#[test]
fn test_all_missing_matrix_gives_degenerate_ranking() {
    let q = Array2::<f64>::zeros((3, 3));
    let report = AlsSolver::new(AlsConfig::new(2, 2, 0.1).with_seed(1))
        .fit(q.view())
        .unwrap();

    assert_eq!(report.degenerate_users, vec![0, 1, 2]);
    assert_eq!(report.degenerate_items, vec![0, 1, 2]);

    let q_hat = report.factors.reconstruct().unwrap();
    let ranking = top_n(q.view(), q_hat.view(), 1, 1, None).unwrap();
    assert!(ranking.degenerate);
    assert_eq!(ranking.indices(), vec![0]);
}

#[test]
fn test_rated_items_rank_below_unrated_items() {
    let q = movie_ratings();
    let w = build_mask(q.view());
    let report = AlsSolver::new(AlsConfig::new(2, 10, 0.1).with_seed(8))
        .fit(q.view())
        .unwrap();
    let q_hat = report.factors.reconstruct().unwrap();
    let table = ScoreTable::new(q.view(), q_hat.view()).unwrap();

    for user in 0..5 {
        let ranking = table.top_n(user, 5, None).unwrap();
        let rated_max = ranking
            .items
            .iter()
            .filter(|item| w[[user, item.index]] == 1.0)
            .fold(f64::NEG_INFINITY, |m, item| m.max(item.score));
        let unrated_min = ranking
            .items
            .iter()
            .filter(|item| w[[user, item.index]] == 0.0)
            .fold(f64::INFINITY, |m, item| m.min(item.score));
        assert!(unrated_min >= rated_max - 1e-9);
        // A degenerate ranking leads with the argmax pick instead.
        if !ranking.degenerate {
            assert!(ranking
                .items
                .windows(2)
                .all(|pair| pair[0].score >= pair[1].score));
        }
        assert_eq!(ranking.items[0].index, table.best_items()[user]);
    }

    assert_eq!(table.best_items().len(), 5);
}

#[test]
fn test_precondition_and_numerical_errors_are_distinct() {
    let q = movie_ratings();

    let err = fit(q.view(), 0, 1, 0.1).unwrap_err();
    assert!(err.is_precondition());
    assert!(!err.is_numerical());

    let err = fit(q.view(), 2, 1, -1.0).unwrap_err();
    assert!(err.is_precondition());

    // Without regularization, user 1 (two ratings) cannot pin down rank 4.
    let err = AlsSolver::new(AlsConfig::new(4, 1, 0.0).with_seed(3))
        .fit(q.view())
        .unwrap_err();
    assert!(err.is_numerical());
}
