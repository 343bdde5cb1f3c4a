use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use school_match::app::SearchPage;
use school_match::autocomplete::{AddressInput, GooglePlacesPredictor, PlaceSelectFn};
use school_match::chat::ChatSession;
use school_match::config::Config;
use school_match::geocode::{GoogleGeocoder, ProxyState, router};
use school_match::models::PlacePrediction;
use school_match::notice::Notice;
use school_match::parameters::Catalog;
use school_match::visual::VisualOutput;

#[derive(Parser)]
#[command(name = "school-match", version, about = "Find schools similar to your search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Place id of the selected address
    #[arg(long)]
    place_id: Option<String>,
    /// Free-text address, resolved through autocomplete
    #[arg(long, conflicts_with = "place_id")]
    address: Option<String>,
    /// Which suggestion to accept when using --address (1-based)
    #[arg(long, default_value_t = 1)]
    pick: usize,
    /// Filter as id=value, e.g. --param "Major=STEM"
    #[arg(long = "param")]
    params: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the geocode proxy
    Proxy,
    /// Resolve the selected place to coordinates through /report
    Report {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Rank schools for the selected place
    Rank {
        #[command(flatten)]
        search: SearchArgs,
        /// Number of schools to return
        #[arg(short, long)]
        k: Option<u32>,
        /// Open the chat for this rank after ranking
        #[arg(long)]
        open: Option<u32>,
    },
    /// Chat about one school, reading messages from stdin
    Chat {
        /// Route printed by `rank`, e.g. "/chat/Foothill%20College?k=3&similarity=0.5"
        route: String,
    },
    /// Print the parameter catalog
    Params,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Command::Proxy => serve_proxy(&config).await,
        Command::Report { search } => {
            let mut page = open_page(&config)?;
            prepare(&mut page, &config, &search).await?;
            let client = school_match::connect(&config)?;
            let result = page.confirm(&client).await;
            print_notices(page.take_notices());
            let location = result?;
            println!("{} {}", location.lat, location.lng);
            Ok(())
        }
        Command::Rank { search, k, open } => {
            let mut page = open_page(&config)?;
            prepare(&mut page, &config, &search).await?;
            if let Some(k) = k {
                page.set_k(k);
            }
            let client = school_match::connect(&config)?;
            let result = page.find_schools(&client).await.map(|r| r.to_vec());
            print_notices(page.take_notices());
            let schools = result?;

            print!("{}", VisualOutput::ranking(&schools));
            for school in &schools {
                if let Some(route) = page.open_school(school.rank) {
                    println!("{:>4}  {}", school.rank, route.path());
                }
            }
            if let Some(rank) = open {
                let route = page
                    .open_school(rank)
                    .with_context(|| format!("no school at rank {rank}"))?;
                chat_loop(&config, ChatSession::from_route(&route)).await?;
            }
            Ok(())
        }
        Command::Chat { route } => chat_loop(&config, ChatSession::open(&route)?).await,
        Command::Params => {
            let catalog = Catalog::schools();
            for param in catalog.iter() {
                println!("{:<55}{}", param.id, param.kind.as_str());
            }
            Ok(())
        }
    }
}

async fn serve_proxy(config: &Config) -> Result<()> {
    let bind = config.proxy_addr()?;
    let upstream = Arc::new(GoogleGeocoder::new(config.maps.geocode_url.clone()));
    let state = ProxyState::new(upstream, config.maps.server_api_key.clone());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "Starting geocode proxy");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn open_page(config: &Config) -> Result<SearchPage> {
    SearchPage::new(config, Catalog::schools()).map_err(|panel| {
        eprintln!("{}", VisualOutput::config_panel(&panel));
        anyhow::anyhow!("{}", panel.message)
    })
}

async fn prepare(page: &mut SearchPage, config: &Config, search: &SearchArgs) -> Result<()> {
    for pair in &search.params {
        page.apply_filter(pair)?;
    }
    for widget in page.widgets() {
        eprintln!("{}", VisualOutput::widget(&widget));
    }

    let place = match (&search.place_id, &search.address) {
        (Some(id), _) => Some(PlacePrediction {
            place_id: id.clone(),
            description: id.clone(),
        }),
        (None, Some(address)) => resolve_address(config, address, search.pick).await?,
        (None, None) => None,
    };
    page.select_place(place);
    Ok(())
}

/// Type the address into the debounced input and accept one suggestion.
async fn resolve_address(
    config: &Config,
    address: &str,
    pick: usize,
) -> Result<Option<PlacePrediction>> {
    let key = config.public_maps_key()?;
    let predictor = Arc::new(GooglePlacesPredictor::new(
        config.maps.autocomplete_url.clone(),
        key,
    ));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let on_place_select: PlaceSelectFn = Arc::new(move |place| {
        let _ = tx.send(place);
    });
    let mut input = AddressInput::new(predictor, config.debounce(), on_place_select);
    let mut suggestions = input.subscribe();

    input.set_input(address);
    tokio::select! {
        changed = suggestions.changed() => changed?,
        // A failed lookup reports `None` through the callback.
        failed = rx.recv() => {
            if failed.is_some() {
                bail!("address lookup failed");
            }
        }
    }

    let list = input.suggestions();
    for (i, s) in list.iter().enumerate() {
        eprintln!("{:>3}. {}", i + 1, s.description);
    }
    let chosen = pick
        .checked_sub(1)
        .and_then(|i| list.get(i))
        .cloned()
        .with_context(|| format!("no suggestion #{pick} for {address:?}"))?;
    input.select(chosen);
    Ok(rx.recv().await.flatten())
}

async fn chat_loop(config: &Config, mut session: ChatSession) -> Result<()> {
    let client = school_match::connect(config)?;
    let catalog = Catalog::schools();

    println!("{}", session.school_name());
    if let Some(url) = session.image_url() {
        println!("{url}");
    }
    println!(
        "{}",
        VisualOutput::query_details(
            session.similarity_badge().as_deref(),
            &session.display_params(&catalog)
        )
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match session.send(&client, &line).await {
            Ok(Some(reply)) => println!("{}", VisualOutput::message(&reply)),
            Ok(None) => {}
            Err(e) => eprintln!("{}", VisualOutput::notice(&Notice::from(&e))),
        }
    }
    Ok(())
}

fn print_notices(notices: Vec<Notice>) {
    for notice in &notices {
        eprintln!("{}", VisualOutput::notice(notice));
    }
}
