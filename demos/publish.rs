//! Publish IVF/Ogg files to a WHIP endpoint
//!
//! Run with: cargo run --example publish -- <INGEST_URL | --lesson ID> [OPTIONS]
//!
//! Examples:
//!   cargo run --example publish -- https://ingest.example.com/whip/live --video camera.ivf
//!   cargo run --example publish -- http://localhost:8080/whip --insecure --audio mic.ogg
//!   API_TOKEN=... cargo run --example publish -- --lesson 42 --video camera.ivf --audio mic.ogg
//!
//! With `--lesson`, the live lesson is opened through the school API
//! (`API_BASE_URL`, `API_TOKEN`) and its ingest URL is used.
//!
//! Producing input files with ffmpeg:
//!   ffmpeg -i input.mp4 -c:v libvpx -b:v 1M -an camera.ivf
//!   ffmpeg -i input.mp4 -c:a libopus -page_duration 20000 -vn mic.ogg
//!
//! Press Ctrl+C to stop the broadcast.

use std::sync::Arc;

use whip_rs::api::{ApiClient, ApiConfig};
use whip_rs::media::{FileDevices, MediaConstraints, NoPreview};
use whip_rs::peer::{RtcTransport, RtcTransportConfig};
use whip_rs::{Broadcaster, PublishEvent, PublisherConfig};

enum Target {
    Url(String),
    Lesson(u64),
}

struct Args {
    target: Target,
    video: Option<String>,
    audio: Option<String>,
    insecure: bool,
    token: Option<String>,
}

fn print_usage() {
    eprintln!("Usage: publish <INGEST_URL | --lesson ID> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --video PATH    VP8 IVF file for the video track");
    eprintln!("  --audio PATH    Opus Ogg file for the audio track");
    eprintln!("  --token TOKEN   Bearer token for the WHIP request");
    eprintln!("  --insecure      Allow http:// ingest URLs");
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut target = None;
    let mut video = None;
    let mut audio = None;
    let mut token = None;
    let mut insecure = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} requires a value", name))
        };

        match arg.as_str() {
            "--video" => video = Some(value("--video")?),
            "--audio" => audio = Some(value("--audio")?),
            "--token" => token = Some(value("--token")?),
            "--lesson" => {
                let id = value("--lesson")?;
                let id = id
                    .parse()
                    .map_err(|_| format!("invalid lesson id '{}'", id))?;
                target = Some(Target::Lesson(id));
            }
            "--insecure" => insecure = true,
            other if other.starts_with("--") => return Err(format!("unknown option '{}'", other)),
            url => target = Some(Target::Url(url.to_string())),
        }
    }

    let target = target.ok_or("missing ingest URL or --lesson")?;
    if video.is_none() && audio.is_none() {
        return Err("at least one of --video or --audio is required".into());
    }

    Ok(Args {
        target,
        video,
        audio,
        insecure,
        token,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("whip_rs=debug".parse()?)
                .add_directive("publish=debug".parse()?),
        )
        .init();

    let ingest_url = match args.target {
        Target::Url(url) => url,
        Target::Lesson(id) => {
            let api = ApiClient::new(ApiConfig::from_env())?;
            println!("Opening live lesson {} via {}", id, api.base_url());
            api.open_live_lesson(id).await?
        }
    };

    let mut devices = FileDevices::new();
    if let Some(path) = &args.video {
        devices = devices.video(path);
    }
    if let Some(path) = &args.audio {
        devices = devices.audio(path);
    }

    let constraints = MediaConstraints {
        audio: args.audio.is_some(),
        video: args.video.is_some(),
    };
    let mut config = PublisherConfig::new()
        .constraints(constraints)
        .allow_insecure(args.insecure)
        .terminate_on_stop(true);
    if let Some(token) = args.token {
        config = config.bearer_token(token);
    }

    let transport = RtcTransport::new(RtcTransportConfig::default())?;
    let (broadcaster, mut events) = Broadcaster::new(
        config,
        Arc::new(devices),
        Arc::new(transport),
        Arc::new(NoPreview),
    )?;
    let broadcaster = Arc::new(broadcaster);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PublishEvent::StateChanged(state) => println!("State: {}", state),
                PublishEvent::Published { resource_url } => {
                    println!("Publishing (resource: {})", resource_url.as_deref().unwrap_or("-"));
                }
                PublishEvent::Failed { message, .. } => println!("Failed: {}", message),
                PublishEvent::Stopped => println!("Stopped"),
            }
        }
    });

    println!("Publishing to {}", ingest_url);
    let attempt = {
        let broadcaster = Arc::clone(&broadcaster);
        tokio::spawn(async move { broadcaster.start(&ingest_url).await })
    };

    tokio::select! {
        result = attempt => {
            if let Err(e) = result? {
                eprintln!("Broadcast failed: {}", e);
                std::process::exit(1);
            }
            println!("Press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    broadcaster.stop();
    let stats = broadcaster.stats();
    println!(
        "Done: {} attempt(s), {} published, {:?} on air",
        stats.attempts, stats.successes, stats.total_publish_time
    );

    // Let the DELETE for the session resource go out
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    Ok(())
}
