use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use collabrec::services::onboarding::parse_ranking;
use collabrec::{
    init_tracing, AppState, Config, ItemId, RecommendationRequest, RecommendationResponse,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Query the collaborative filtering engine from the terminal",
    long_about = None
)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Overrides the configured ratings file.
    #[arg(long)]
    ratings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the most rated items.
    Popular {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Recommend from explicit ratings, e.g. `-r 50=5 -r 181=4.5 -r 100=4`.
    Recommend {
        #[arg(short = 'r', long = "rating", value_parser = parse_rating_pair, required = true)]
        ratings: Vec<(ItemId, f32)>,

        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Rank a handful of popular items and get recommendations for that taste.
    Rank {
        #[arg(short, long)]
        items: Option<usize>,

        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

fn parse_rating_pair(value: &str) -> Result<(ItemId, f32), String> {
    let (item, rating) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ITEM=RATING, got '{}'", value))?;
    let item_id = item.trim().parse().map_err(|_| format!("invalid item id '{}'", item))?;
    let rating = rating.trim().parse().map_err(|_| format!("invalid rating '{}'", rating))?;
    Ok((item_id, rating))
}

fn print_recommendations(response: &RecommendationResponse) {
    if response.is_empty() {
        println!(
            "Not enough similar users to recommend anything ({} candidates, {} neighbors).",
            response.candidate_count, response.neighbor_count
        );
        println!("Try rating other items.");
        return;
    }

    println!("You might like:");
    for (rank, item) in response.recommendations.iter().enumerate() {
        println!(
            "{:>2}. {} (predicted rating {:.2})",
            rank + 1,
            item.title,
            item.predicted_rating
        );
    }
}

async fn rank(state: &AppState, items: Option<usize>, count: Option<usize>) -> Result<()> {
    let prompt = state.onboarding_service.ranking_prompt(items)?;

    println!("Order these from favourite to least favourite:\n");
    for item in &prompt.items {
        println!("{}. {}", item.position, item.title);
    }
    println!("\nEnter the numbers separated by commas, e.g. 3, 1, 5, 2, 4");

    let ratings = {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("> ");
            io::stdout().flush()?;

            let line = lines.next().ok_or_else(|| anyhow!("no ranking given"))??;
            match parse_ranking(&line).and_then(|ranking| {
                state.onboarding_service.ratings_from_ranking(&prompt, &ranking)
            }) {
                Ok(ratings) => break ratings,
                Err(e) => println!("{}", e),
            }
        }
    };

    let mut request = RecommendationRequest::new(ratings);
    request.num_recommendations = count;
    let response = state.serving_service.serve_recommendations(request).await?;
    print_recommendations(&response);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = Config::load(&args.config)?;
    if let Some(ratings) = args.ratings {
        config.data.ratings_path = ratings;
    }

    let state = AppState::new(config)?;
    state.recommendation_service.load().await?;
    info!("Corpus loaded");

    match args.command {
        Command::Popular { limit } => {
            let items = state.recommendation_service.popular_items(limit)?;
            for (rank, item) in items.iter().enumerate() {
                println!("{:>3}. {} ({} ratings)", rank + 1, item.title, item.rating_count);
            }
        }
        Command::Recommend { ratings, count } => {
            let mut request = RecommendationRequest::new(ratings.into_iter().collect());
            request.num_recommendations = count;
            let response = state.serving_service.serve_recommendations(request).await?;
            print_recommendations(&response);
        }
        Command::Rank { items, count } => rank(&state, items, count).await?,
    }

    Ok(())
}
