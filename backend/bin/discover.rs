use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use restart::{
    services::ProfileFilters,
    utils::init_logging,
    AppState, Config,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let matches = Command::new("discover")
        .about("Print the members a viewer can still connect with")
        .arg(
            Arg::new("viewer")
                .long("viewer")
                .required(true)
                .help("Email of the member browsing the directory"),
        )
        .arg(Arg::new("interest").long("interest").help("Only members with this interest"))
        .arg(Arg::new("location").long("location").help("Case-insensitive location substring"))
        .arg(
            Arg::new("looking-for")
                .long("looking-for")
                .action(ArgAction::Append)
                .help("Looking-for tag, repeatable; \"all\" first disables the filter"),
        )
        .arg(
            Arg::new("relationships")
                .long("relationships")
                .help("Print the status map instead of discoverable profiles")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let viewer = matches
        .get_one::<String>("viewer")
        .cloned()
        .unwrap_or_default();

    let config = Config::from_env()?;
    let state = AppState::from_config(&config).await?;

    if matches.get_flag("relationships") {
        let relationships = state.directory.relationships(&viewer).await?;
        for warning in &relationships.warnings {
            warn!("⚠️  {}", warning);
        }
        println!("{}", serde_json::to_string_pretty(&relationships.statuses)?);
        return Ok(());
    }

    let filters = ProfileFilters {
        interest: matches.get_one::<String>("interest").cloned(),
        location: matches.get_one::<String>("location").cloned(),
        looking_for: matches
            .get_many::<String>("looking-for")
            .map(|tags| tags.cloned().collect())
            .unwrap_or_default(),
    };

    info!("🔍 Discovering profiles for {}", viewer);
    let discovery = state.directory.discover(&viewer, &filters).await?;
    for warning in &discovery.warnings {
        warn!("⚠️  {}", warning);
    }
    info!("✅ {} discoverable profiles", discovery.profiles.len());

    println!("{}", serde_json::to_string_pretty(&discovery.profiles)?);
    Ok(())
}
