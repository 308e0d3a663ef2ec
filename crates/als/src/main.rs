//! ALS demo - fits a small movie rating matrix and prints recommendations
//!
//! Settings come from `ALS_*` environment variables (see `AlsConfig`).

use als_recommender::{
    build_mask, load_dotenv, weighted_error, AlsConfig, AlsSolver, ScoreTable,
};
use anyhow::{Context, Result};
use ndarray::array;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MOVIES: [&str; 5] = ["Alien", "Brazil", "Casablanca", "Dune", "Eraserhead"];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    load_dotenv();

    let config = AlsConfig::from_env().context("Failed to load ALS configuration")?;
    config.validate().context("Invalid ALS configuration")?;

    // 0 marks a missing rating. Rows are users, columns are movies.
    let ratings = array![
        [5.0, 5.0, 5.0, 5.0, 1.0],
        [0.0, 0.0, 0.0, 4.0, 1.0],
        [1.0, 2.0, 3.0, 3.0, 1.0],
        [2.0, 2.0, 2.0, 1.0, 0.0],
        [5.0, 2.0, 5.0, 1.0, 0.0]
    ];

    info!(
        rank = config.rank,
        iterations = config.iterations,
        regularization = config.regularization,
        strategy = %config.strategy,
        "Fitting rating matrix"
    );

    let solver = AlsSolver::new(config);
    let report = solver.fit(ratings.view()).context("ALS fit failed")?;

    let mask = build_mask(ratings.view());
    let error = weighted_error(
        mask.view(),
        ratings.view(),
        &report.factors.user_factors,
        &report.factors.item_factors,
    )?;
    println!("Weighted error: {:.4}", error);

    let q_hat = report.factors.reconstruct()?;
    println!("Reconstructed ratings:\n{:.2}", q_hat);

    let table = ScoreTable::new(ratings.view(), q_hat.view())?;
    let best = table.best_items();
    for (user, item) in best.iter().enumerate() {
        println!("User {} will like movie {} ({})", user, item, MOVIES[*item]);
    }

    let rankings = (0..table.num_users())
        .map(|user| table.top_n(user, 2, Some(&MOVIES[..])))
        .collect::<als_recommender::Result<Vec<_>>>()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&rankings).context("Failed to serialize rankings")?
    );

    Ok(())
}
