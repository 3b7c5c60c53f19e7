use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use nd_core::{Article, Ingestor, DATE_FILTER};
use nd_inference::embeddings::{DummyEmbedder, EmbeddingPipeline, DEFAULT_PERPLEXITY};
use nd_inference::similarity::{average_linkage_tracked, embeddings_of, find_similar, group_by_similarity_tracked};
use nd_inference::{AiTagger, TaggingOptions, TaggingRequest};
use nd_progress::{progress_channel, CancellationToken, ProgressStage};
use nd_storage::{apply_date_filter, apply_keyword_filter, collect_export, ArticleStore, JsonFeedIngestor};

use crate::cli::{Cli, Commands, FilterArgs, GroupArgs, SimilarArgs, TagArgs};

pub async fn handle_command(cli: Cli) -> Result<()> {
    let store = load_store(&cli.input).await?;
    match cli.command {
        Commands::Filters(args) => run_filters(&store, args).await,
        Commands::Tag(args) => {
            let options = load_options(cli.config.as_deref())?;
            run_tag(Arc::new(store), options, args).await
        }
        Commands::Group(args) => run_group(&store, args).await,
        Commands::Similar(args) => run_similar(&store, args).await,
    }
}

async fn load_store(input: &Path) -> Result<ArticleStore> {
    let source = input.to_string_lossy();
    let articles = JsonFeedIngestor::new()
        .ingest(&source)
        .await
        .with_context(|| format!("Failed to load articles from {}", source))?;
    let store = ArticleStore::new();
    let added = store.extend(articles).await;
    tracing::info!("📚 Loaded {} articles", added);
    Ok(store)
}

pub fn load_options(config: Option<&Path>) -> Result<TaggingOptions> {
    match config {
        Some(path) => TaggingOptions::load(path).with_context(|| format!("Failed to read config {}", path.display())),
        None => Ok(TaggingOptions::default()),
    }
}

fn describe(article: &Article) -> String {
    format!(
        "{} {}{}",
        article.publication_date.format("%Y-%m-%d"),
        article.title,
        article.url.as_deref().map(|url| format!(" - {}", url)).unwrap_or_default()
    )
}

async fn run_filters(store: &ArticleStore, args: FilterArgs) -> Result<()> {
    apply_date_filter(store, args.dates.start, args.dates.end).await;
    for keyword in &args.keywords {
        apply_keyword_filter(store, keyword).await;
    }

    let mut names = vec![DATE_FILTER.to_string()];
    names.extend(args.keywords.iter().cloned());
    let passing = store.compose_and(&names).await;

    println!("Filters: {}", store.list_filter_names().await.into_iter().collect::<Vec<_>>().join(", "));
    println!("{} of {} articles pass all filters", passing.len(), store.len().await);
    for article in &passing {
        println!("  {}", describe(article));
    }
    Ok(())
}

/// Token that fires on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupted, stopping after the current step");
            interrupt.cancel();
        }
    });
    cancel
}

async fn run_tag(store: Arc<ArticleStore>, mut options: TaggingOptions, args: TagArgs) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        options.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout {
        options.request_timeout = timeout;
    }

    apply_date_filter(&store, args.dates.start, args.dates.end).await;

    let request = TaggingRequest::new(&args.name, &args.prompt, &args.provider).with_credentials(args.credentials.into());
    let tagger = Arc::new(AiTagger::new(options));
    let cancel = cancel_on_ctrl_c();

    let (handle, mut progress) = tagger.spawn(store.clone(), request, cancel);
    while let Some(event) = progress.next().await {
        match event.stage {
            ProgressStage::Item => println!(
                "[{}/{}] {}: {}",
                event.completed,
                event.total,
                event.subject.as_deref().unwrap_or_default(),
                event.status
            ),
            ProgressStage::Started | ProgressStage::Finished | ProgressStage::Cancelled => {
                println!("{}", event.status)
            }
        }
    }
    let report = handle.await.context("Tagging task failed")?;

    println!(
        "{} judged, {} matched, {} failed, {} excluded{}",
        report.judged,
        report.matched,
        report.failed,
        report.excluded,
        if report.cancelled { " (cancelled)" } else { "" }
    );

    if let Some(path) = args.export {
        let matching = store.compose_and(&[DATE_FILTER, args.name.as_str()]).await;
        let ids: Vec<_> = matching.into_iter().map(|article| article.id).collect();
        store.select_all(&ids).await;

        let records = collect_export(&store, None).await;
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Exported {} articles to {}", records.len(), path.display());
    }
    Ok(())
}

/// Fill missing embeddings with the offline embedder, matching the width of
/// any vectors the feed already carried.
async fn ensure_embeddings(store: &ArticleStore) -> Result<()> {
    let articles = store.snapshot().await;
    if articles.iter().all(|article| article.embedding.is_some()) {
        return Ok(());
    }
    let widths: BTreeSet<usize> = articles
        .iter()
        .filter_map(|article| article.embedding.as_ref().map(Vec::len))
        .collect();
    if widths.len() > 1 {
        bail!("Feed embeddings have mixed widths {:?}", widths);
    }
    let dimensions = widths.into_iter().next().unwrap_or(768);

    let embedder = DummyEmbedder::new(dimensions);
    if embedder.dimensions() != dimensions {
        bail!(
            "Feed embeddings have {} dimensions, the offline embedder needs at least {}",
            dimensions,
            DummyEmbedder::MIN_DIMENSIONS
        );
    }

    tracing::warn!("⚠️ Some articles have no embedding, using the offline embedder");
    EmbeddingPipeline::new(Arc::new(embedder))
        .compute_and_assign(store, DEFAULT_PERPLEXITY)
        .await?;
    Ok(())
}

async fn run_group(store: &ArticleStore, args: GroupArgs) -> Result<()> {
    ensure_embeddings(store).await?;
    let articles = store.snapshot().await;
    let embeddings = embeddings_of(&articles)?;
    let cancel = cancel_on_ctrl_c();

    let (progress, mut events) = progress_channel();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            tracing::debug!("[{}/{}] {}", event.completed, event.total, event.status);
        }
    });

    let groups = group_by_similarity_tracked(&embeddings, args.threshold, progress.clone(), &cancel)?;

    println!("{} groups at threshold {}", groups.len(), args.threshold);
    for (n, group) in groups.iter().enumerate() {
        println!("Group {} ({} articles)", n + 1, group.len());
        for &index in group {
            println!("  {}", describe(&articles[index]));
        }
    }

    if args.dendrogram {
        println!("Average-linkage merges (cosine distance):");
        for merge in average_linkage_tracked(&embeddings, progress, &cancel)? {
            println!(
                "  {:>4} + {:<4} at {:.4} ({} articles)",
                merge.left, merge.right, merge.distance, merge.size
            );
        }
    }
    Ok(())
}

async fn run_similar(store: &ArticleStore, args: SimilarArgs) -> Result<()> {
    ensure_embeddings(store).await?;
    let articles = store.snapshot().await;
    let Some(target) = articles.iter().find(|article| article.title == args.title) else {
        bail!("No article titled '{}'", args.title);
    };

    let similar = find_similar(target, &articles, args.threshold)?;
    if similar.is_empty() {
        println!("No article is more similar than {}", args.threshold);
    }
    for hit in similar {
        println!("{:.3} {}", hit.similarity, describe(hit.article));
    }
    Ok(())
}
