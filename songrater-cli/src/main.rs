use std::{env, process, sync::Arc};

use env_logger::{Builder, Env};
use songrater_core::{
    binding::{Bindings, CLEARED_NOTICE, INCOMPLETE_NOTICE, SAVED_NOTICE},
    cache::TrackCache,
    config::Config,
    error::Error,
    fetch::{TrackFetcher, Window},
    host::Notifier,
    page::PageKey,
    rating::RatingStore,
    storage::{JsonStorage, Storage},
    sync::{RatingChange, RatingSync},
    track::{Track, TrackUri},
    webapi::WebApi,
};

const ENV_LOG: &str = "SONGRATER_LOG";
const ENV_LOG_STYLE: &str = "SONGRATER_LOG_STYLE";
const ENV_TOKEN: &str = "SPOTIFY_TOKEN";

const USAGE: &str = "usage:
    songrater-cli tracks playlist <id> | album <id> | saved
    songrater-cli rate <track-uri> <stars> [name]
    songrater-cli rating <track-uri>
    songrater-cli bind <url-1> <url-2> <url-3> <url-4> <url-5>
    songrater-cli unbind
    songrater-cli bindings";

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

fn main() {
    // Setup logging from the env variables, with defaults.
    Builder::from_env(
        Env::new()
            .filter_or(ENV_LOG, "info")
            .write_style(ENV_LOG_STYLE),
    )
    .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    if let Err(err) = run(&args) {
        log::error!("{}", err);
        process::exit(1);
    }
}

fn run(args: &[&str]) -> Result<(), Error> {
    let config = Config::load()?.unwrap_or_default();
    let storage_path = Config::storage_path()
        .ok_or_else(|| Error::ConfigError("no config directory".into()))?;
    let storage: Arc<dyn Storage> = Arc::new(JsonStorage::open(storage_path)?);
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    match args {
        ["tracks", source @ ..] => {
            let page = match source {
                ["playlist", id] => PageKey::playlist(*id),
                ["album", id] => PageKey::album(*id),
                ["saved"] => PageKey::saved_tracks(),
                _ => return usage(),
            };
            list_tracks(&config, page, notifier)
        }
        ["rate", uri, stars, name @ ..] => {
            let Some(stars) = parse_stars(stars) else {
                eprintln!("invalid star count: {}", stars);
                return usage();
            };
            let track = Track::new(*uri, name.first().copied().unwrap_or(*uri));
            rate(&track, stars, storage, notifier)
        }
        ["rating", uri] => {
            let rating = RatingStore::new(storage).rating(&TrackUri::from(*uri));
            println!("{}", rating);
            Ok(())
        }
        ["bind", urls @ ..] => {
            match Bindings::new(storage).save_all(urls) {
                Ok(()) => notifier.notify(SAVED_NOTICE),
                Err(Error::InvalidBinding { level }) => {
                    log::warn!("invalid playlist URL for level {}", level);
                    notifier.notify(INCOMPLETE_NOTICE);
                }
                Err(err) => return Err(err),
            }
            Ok(())
        }
        ["unbind"] => {
            Bindings::new(storage).clear_all()?;
            notifier.notify(CLEARED_NOTICE);
            Ok(())
        }
        ["bindings"] => {
            for (level, url) in Bindings::new(storage).load_all().into_iter().enumerate() {
                println!("{}\t{}", level + 1, url.unwrap_or_default());
            }
            Ok(())
        }
        _ => usage(),
    }
}

/// Non-numeric text is a usage error; the rating range is checked when the
/// rating is set.
fn parse_stars(text: &str) -> Option<u8> {
    text.trim().parse().ok()
}

fn usage() -> Result<(), Error> {
    eprintln!("{}", USAGE);
    process::exit(2);
}

fn web_api() -> Result<Arc<WebApi>, Error> {
    let token = env::var(ENV_TOKEN)
        .map_err(|_| Error::ConfigError(format!("{} is not set", ENV_TOKEN)))?;
    Ok(Arc::new(WebApi::new(token, Config::proxy().as_deref())?))
}

fn list_tracks(config: &Config, page: PageKey, notifier: Arc<dyn Notifier>) -> Result<(), Error> {
    let fetcher = TrackFetcher::new(web_api()?, config.fetch_policy());
    let cache = TrackCache::new(Arc::new(fetcher), notifier);
    let window = Window {
        offset: 0,
        limit: config.page_size,
    };
    let tracks = cache.get(&page, window, false, 0)?;
    for track in tracks.iter() {
        println!(
            "{}\t{}\t{} - {}",
            track.index, track.uri, track.artists, track.name
        );
    }
    log::info!("{} tracks in {}", tracks.len(), page);
    Ok(())
}

fn rate(
    track: &Track,
    stars: u8,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
) -> Result<(), Error> {
    let ratings = RatingSync::new(
        RatingStore::new(storage.clone()),
        Bindings::new(storage),
        web_api()?,
        notifier,
    );
    match ratings.set_rating(track, stars)? {
        RatingChange::Rated { previous, rating } => {
            log::info!("{}: {} -> {} stars", track.uri, previous, rating)
        }
        RatingChange::Cleared { rating } => {
            log::info!("{}: {} stars cleared", track.uri, rating)
        }
    }
    ratings.wait_idle();
    Ok(())
}
