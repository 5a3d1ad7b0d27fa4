//! Terminal ranking of the city table.

use dialoguer::{Input, Select};
use smart_city_city_models::ScoreWeights;
use smart_city_scoring::{DEFAULT_TOP_N, ScoredCity, registry};
use smart_city_server::table_path;

/// Prompts for weights and prints the top-ranked cities.
///
/// # Errors
///
/// Returns an error if a prompt fails or the city table cannot be read.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let weights = prompt_weights()?;

    let top_n: usize = Input::new()
        .with_prompt("How many cities?")
        .default(DEFAULT_TOP_N)
        .interact_text()?;

    let path = table_path();
    log::info!("Loading city table from {}", path.display());
    let table = smart_city_table::read_city_table(&path)?;

    let ranking = smart_city_scoring::score(&table, weights, top_n);
    let applied = ranking.weights().weights();

    println!();
    println!(
        "Weights: safety {:.2}, income {:.2}, affordability {:.2}",
        applied.safety, applied.income, applied.affordability
    );
    println!();
    print_table(ranking.top());

    Ok(())
}

fn prompt_weights() -> Result<ScoreWeights, dialoguer::Error> {
    let profiles = registry::all_profiles();
    let mut labels: Vec<String> = profiles
        .iter()
        .map(|p| format!("{} - {}", p.name, p.description))
        .collect();
    labels.push("Custom weights".to_string());

    let idx = Select::new()
        .with_prompt("Weight profile")
        .items(&labels)
        .default(0)
        .interact()?;

    if let Some(profile) = profiles.get(idx) {
        return Ok(profile.weights);
    }

    let prompt = |label: &str| -> Result<f64, dialoguer::Error> {
        Input::new()
            .with_prompt(format!("{label} weight"))
            .default(1.0)
            .interact_text()
    };

    Ok(ScoreWeights::new(
        prompt("Safety")?,
        prompt("Income")?,
        prompt("Affordability")?,
    ))
}

fn print_table(cities: &[ScoredCity<'_>]) {
    println!(
        "{:>4}  {:<28} {:<6} {:>10} {:>12} {:>10} {:>9}",
        "#", "City", "State", "Population", "Med. income", "Crime/100k", "UserScore"
    );
    for (i, scored) in cities.iter().enumerate() {
        let r = scored.record;
        println!(
            "{:>4}  {:<28} {:<6} {:>10} {:>12.0} {:>10.1} {:>9.4}",
            i + 1,
            r.city,
            r.state,
            r.population,
            r.median_household_income_2020,
            r.violent_crime_rate_2020,
            scored.user_score
        );
    }
}
