//! Dev bootstrap: seeds a demo catalog, processes one photo and prints the
//! resulting detections, matches and provenance.
//!
//! Usage: `artprov [config.json]`. Without a config file an in-memory
//! database is used.

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};
use serde::Serialize;

use artprov::config::{load_config, Config};
use artprov::logging::init_logging;
use artprov::seed::seed_demo_catalog;
use artprov::{ArtprovError, DetectionJob, ProvenanceService};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const JOB_TIMEOUT: Duration = Duration::from_secs(60);

fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config {
            in_memory: true,
            ..Config::default()
        },
    };

    if let Err(e) = init_logging(&config.logging.level, config.logging.format) {
        eprintln!("{}", e);
    }

    info!("Starting artprov v{}", env!("CARGO_PKG_VERSION"));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), ArtprovError> {
    let service = ProvenanceService::from_config(config)?;
    info!("Vector index: {:?}", service.vector_index());

    let seeded = seed_demo_catalog(service.database(), service.vector_index())?;
    let Some(&exhibition_id) = seeded.exhibition_ids.first() else {
        info!("No exhibitions seeded, nothing to process");
        service.wait();
        return Ok(());
    };

    let submitted =
        service.submit_photo(exhibition_id, "https://example.com/photos/installation_01.jpg")?;
    print_json("submitted", &submitted);

    let job = wait_for_job(&service, &submitted.job_id)?;
    print_json("job", &job);

    let detections = service.photo_detections(submitted.installation_photo_id)?;
    print_json("detections", &detections);

    if let Some(first) = detections.detections.first() {
        let matches = service.get_matches(first.id)?;
        print_json("matches", &matches);

        let confirmed_id = matches
            .similar_artworks
            .first()
            .map(|m| m.artwork_id)
            .unwrap_or(first.artwork_id);
        let confirmation = service.confirm_match(first.id, confirmed_id)?;
        print_json("confirmation", &confirmation);

        let history = service.artwork_provenance(confirmed_id)?;
        print_json("provenance", &history);
    }

    print_json("index", &service.catalog().index_stats());

    service.wait();
    Ok(())
}

fn wait_for_job(service: &ProvenanceService, job_id: &str) -> Result<DetectionJob, ArtprovError> {
    let started = Instant::now();
    loop {
        let job = service.job_status(job_id)?;
        if job.is_finished() || started.elapsed() > JOB_TIMEOUT {
            return Ok(job);
        }
        info!("Job {}: {}% {}", job.job_id, job.progress_percentage, job.message);
        thread::sleep(POLL_INTERVAL);
    }
}

fn print_json<T: Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("== {} ==\n{}", label, json),
        Err(e) => error!("Failed to serialize {}: {}", label, e),
    }
}
