use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use abcd_analyzer::annotations::dispatcher::AnnotationDispatcher;
use abcd_analyzer::annotations::service::VideoIntelligenceClient;
use abcd_analyzer::annotations::{store, AnnotationKind};
use abcd_analyzer::config::Config;
use abcd_analyzer::detectors::FeatureCatalog;
use abcd_analyzer::evaluation::{evaluate, merge_secondary};
use abcd_analyzer::knowledge_graph::{BrandKnowledge, KnowledgeGraphClient};
use abcd_analyzer::llm::{evaluate_features_with_llm, GeminiProvider};
use abcd_analyzer::report;
use abcd_analyzer::video::{discover_videos, VideoAsset};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("ABCD Analyzer")
        .version("0.1.0")
        .about("Assesses marketing videos against the ABCD rubric")
        .arg(
            Arg::new("video-dir")
                .short('d')
                .long("video-dir")
                .value_name("DIR")
                .help("Directory containing videos to assess")
                .required(true),
        )
        .arg(
            Arg::new("annotations-dir")
                .short('a')
                .long("annotations-dir")
                .value_name("DIR")
                .help("Root directory for per-video annotation artifacts"),
        )
        .arg(
            Arg::new("brand")
                .short('b')
                .long("brand")
                .value_name("NAME")
                .help("Brand featured in the videos"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let filter = if matches.get_flag("verbose") {
        "abcd_analyzer=debug,info"
    } else {
        "abcd_analyzer=info,warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let video_dir = PathBuf::from(matches.get_one::<String>("video-dir").unwrap());

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default().with_env_overrides()
    });
    if let Some(dir) = matches.get_one::<String>("annotations-dir") {
        config.output.annotations_dir = PathBuf::from(dir);
    }
    if let Some(brand) = matches.get_one::<String>("brand") {
        config.brand.brand_name = brand.clone();
        if config.brand.brand_variations.is_empty() {
            config.brand.brand_variations = vec![brand.clone()];
        }
    }
    config.validate()?;

    info!("🚀 ABCD Analyzer starting...");
    info!("📁 Video directory: {}", video_dir.display());
    info!(
        "📂 Annotations directory: {}",
        config.output.annotations_dir.display()
    );

    if !video_dir.exists() {
        error!("Video directory does not exist: {}", video_dir.display());
        return Err(anyhow::anyhow!("Video directory not found"));
    }

    let videos = discover_videos(&video_dir, &config.output.video_extensions);
    if videos.is_empty() {
        warn!("No videos found in {}", video_dir.display());
        return Ok(());
    }
    info!("🎬 Found {} video(s)", videos.len());

    // Brand knowledge is resolved once per run; a failed lookup aborts
    // before any per-video work starts.
    let knowledge = match &config.service.knowledge_graph_api_key {
        Some(key) => {
            let kg = KnowledgeGraphClient::new(key.clone())?;
            kg.brand_knowledge(&config.brand.brand_variations, &config.brand.branded_products)
                .await?
        }
        None => {
            warn!("No Knowledge Graph API key; logo and label entity matching is name-only");
            BrandKnowledge::default()
        }
    };

    let service = Arc::new(VideoIntelligenceClient::new(
        config.service.endpoint.clone(),
        config.service.poll_interval_seconds,
    )?);
    let dispatcher = AnnotationDispatcher::new(
        service,
        Duration::from_secs(config.service.request_timeout_seconds),
    );

    let llm_provider = if config.llm.enabled {
        Some(GeminiProvider::new(&config)?)
    } else {
        None
    };
    let catalog = FeatureCatalog::standard();

    let start_time = std::time::Instant::now();
    let mut assessed = 0usize;
    let mut failed = 0usize;

    for path in &videos {
        let video = match VideoAsset::from_file(path).await {
            Ok(video) => video,
            Err(e) => {
                error!("❌ Cannot read {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        let annotation_dir = config.annotation_dir_for(&video.filename);
        let all_present = AnnotationKind::ALL
            .iter()
            .all(|kind| annotation_dir.join(kind.file_name()).exists());

        if all_present {
            info!("📦 Reusing cached annotations for {}", video.filename);
        } else if let Err(e) = dispatcher.dispatch(&video, &annotation_dir).await {
            error!("❌ Annotation dispatch failed for {}: {}", video.filename, e);
            failed += 1;
            continue;
        }

        let set = match store::load_dir(&annotation_dir, knowledge.clone()).await {
            Ok(set) => set,
            Err(e) => {
                error!("❌ Cannot load annotations for {}: {}", video.filename, e);
                failed += 1;
                continue;
            }
        };

        let mut result = evaluate(&config, &video, &set);

        if let Some(provider) = &llm_provider {
            match evaluate_features_with_llm(provider, &video, &catalog).await {
                Ok(secondary) => merge_secondary(&mut result, &secondary),
                Err(e) => warn!("LLM evaluation failed for {}: {}", video.filename, e),
            }
        }

        println!("{}", report::render(&config, &result));
        assessed += 1;
    }

    let duration = start_time.elapsed();
    info!("🎉 Assessment completed in {:.2}s", duration.as_secs_f64());
    info!("✅ Assessed: {}", assessed);
    if failed > 0 {
        info!("❌ Failed: {}", failed);
    }

    Ok(())
}
