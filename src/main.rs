use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use homedir::my_home;
use serde::Serialize;

use slidepic::config::{Config, ProviderConfig};
use slidepic::search::{self, Candidate, CandidateSearch};
use slidepic::selector::{ImageSelector, PresentationRun, Selection, SlideRequest};
use slidepic::semantic::{EmbeddingProvider, SimilarityRanker};
use slidepic::translation::{TranslationOutcome, Translator};

mod cli;

#[derive(Serialize)]
struct SlideReport {
    title: String,
    url: Option<String>,
    description: Option<String>,
    path: String,
}

impl SlideReport {
    fn new(slide: &SlideRequest, selection: Selection) -> Self {
        match selection {
            Selection::Selected { candidate, path } => Self {
                title: slide.title.clone(),
                url: Some(candidate.url),
                description: Some(candidate.description),
                path: path.to_string(),
            },
            Selection::NoImage { reason } => Self {
                title: slide.title.clone(),
                url: None,
                description: None,
                path: format!("no-image ({reason:?})"),
            },
        }
    }
}

fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("SLIDEPIC_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .context("couldnt find home dir")?
        .context("couldnt find home dir")?;
    Ok(home.join(".local/share/slidepic"))
}

fn load_config() -> anyhow::Result<ProviderConfig> {
    let base_path = base_path()?;
    let config = Config::load_with(&base_path)
        .with_context(|| format!("invalid configuration in {}", base_path.display()))?;
    Ok(config.resolve()?)
}

fn read_slides(path: &Path, topic: Option<&str>) -> anyhow::Result<Vec<SlideRequest>> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut slides: Vec<SlideRequest> = serde_json::from_slice(&data)?;

    if let Some(topic) = topic {
        for slide in slides.iter_mut().filter(|s| s.topic.is_none()) {
            slide.topic = Some(topic.to_string());
        }
    }
    Ok(slides)
}

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let config = load_config()?;

    let embeddings = Arc::new(EmbeddingProvider::from_settings(
        &config.semantic,
        config.base_path.clone(),
    ));
    let translator = Arc::new(Translator::from_config(&config)?);

    match args.command {
        cli::Command::Select {
            slides,
            title,
            content,
            topic,
        } => {
            let slides = match (slides, title) {
                (Some(path), _) => read_slides(&path, topic.as_deref())?,
                (None, Some(title)) => {
                    let mut slide = SlideRequest::new(title, content);
                    slide.topic = topic;
                    vec![slide]
                }
                (None, None) => bail!("either --slides or --title is required"),
            };

            let search: Arc<dyn CandidateSearch> = search::from_backend(&config.search)?;
            let selector = ImageSelector::new(config.semantic.clone(), embeddings, translator, search);
            let mut run = PresentationRun::new(&selector);

            let mut reports = Vec::with_capacity(slides.len());
            for (idx, slide) in slides.iter().enumerate() {
                let span = tracing::info_span!("slide", idx = idx + 1);
                let _enter = span.enter();

                let selection = run.select_next(slide);
                reports.push(SlideReport::new(slide, selection));
            }

            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(())
        }

        cli::Command::Translate {
            text,
            from,
            to,
            context,
            check,
        } => {
            if check {
                let reachable = translator.is_reachable();
                println!(
                    "provider={} enabled={} reachable={reachable}",
                    translator.provider_name(),
                    translator.is_enabled()
                );
                return Ok(());
            }

            let target = to.unwrap_or_else(|| translator.target_language().to_string());
            match translator.translate_for_search(&text, from.as_deref(), &target, &context) {
                TranslationOutcome::Translated {
                    text,
                    provider,
                    cached,
                } => println!("{text}\t(provider={provider} cached={cached})"),
                TranslationOutcome::Unchanged { text, reason } => {
                    println!("{text}\t(unchanged: {reason:?})")
                }
            }
            Ok(())
        }

        cli::Command::Similarity {
            title,
            content,
            description,
        } => {
            let ranker = SimilarityRanker::new(embeddings);
            match ranker.similarity_for(&title, &content, &description) {
                Some(similarity) => println!("{similarity:.4}"),
                None => bail!("embedding model unavailable"),
            }
            Ok(())
        }

        cli::Command::Rank {
            title,
            content,
            query,
            candidates,
            top,
        } => {
            let candidates: Vec<Candidate> = match candidates {
                Some(path) => {
                    let data = std::fs::read(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    serde_json::from_slice(&data)?
                }
                None => {
                    let search = search::from_backend(&config.search)?;
                    let query = query.unwrap_or_else(|| title.clone());
                    let query = translator.translate_query(&query, "").into_text();
                    search
                        .search_candidates(&query, config.semantic.max_candidates)
                        .with_context(|| format!("search for '{query}' failed"))?
                }
            };

            let ranker = SimilarityRanker::new(embeddings);
            let ranked = ranker.rank_top_k(&title, &content, &candidates, top);
            if ranked.is_empty() && !candidates.is_empty() {
                bail!("embedding model unavailable");
            }

            for r in ranked {
                println!("{:.4}\t{}\t{}", r.similarity, r.candidate.url, r.candidate.description);
            }
            Ok(())
        }
    }
}
