//! Cosine similarity, greedy grouping and nearest-article lookup over
//! article embeddings.

mod linkage;

use std::collections::HashMap;

use nd_core::Article;
use nd_progress::{CancellationToken, JobTracker, ProgressSender};

use crate::error::SimilarityError;

pub use linkage::{average_linkage, average_linkage_tracked, cosine_distance_matrix, Merge};

/// Cosine of the angle between two vectors.
///
/// A zero vector yields `0.0`. Vectors of different length are an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return Ok(0.0);
    }
    Ok((dot / denom) as f32)
}

pub(crate) fn check_dimensions<V: AsRef<[f32]>>(embeddings: &[V]) -> Result<(), SimilarityError> {
    if let Some(first) = embeddings.first() {
        let expected = first.as_ref().len();
        for embedding in embeddings {
            let len = embedding.as_ref().len();
            if len != expected {
                return Err(SimilarityError::DimensionMismatch {
                    left: expected,
                    right: len,
                });
            }
        }
    }
    Ok(())
}

/// Greedy single-pass grouping.
///
/// Each unassigned index in order seeds a group, and every later unassigned
/// index joins it when its similarity to the seed is strictly above
/// `threshold`. Members are never compared with each other, so groups are not
/// transitive and depend on input order. Every index lands in exactly one group.
pub fn group_by_similarity<V: AsRef<[f32]>>(
    embeddings: &[V],
    threshold: f32,
) -> Result<Vec<Vec<usize>>, SimilarityError> {
    group_by_similarity_tracked(embeddings, threshold, ProgressSender::disabled(), &CancellationToken::new())
}

/// [`group_by_similarity`] reporting one progress item per index.
///
/// `cancel` is checked before each index; once it fires the pass stops with
/// [`SimilarityError::Cancelled`] and a `Cancelled` event.
pub fn group_by_similarity_tracked<V: AsRef<[f32]>>(
    embeddings: &[V],
    threshold: f32,
    progress: ProgressSender,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<usize>>, SimilarityError> {
    check_dimensions(embeddings)?;

    let n = embeddings.len();
    let mut tracker = JobTracker::new(n, progress);
    tracker.start(format!("Grouping {} embeddings at threshold {}", n, threshold));

    let mut assigned = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if cancel.is_cancelled() {
            let completed = tracker.completed();
            tracker.cancel(format!("Grouping cancelled after {}/{}", completed, n));
            return Err(SimilarityError::Cancelled { completed, total: n });
        }
        if assigned[i] {
            tracker.complete(i.to_string(), "already grouped");
            continue;
        }
        assigned[i] = true;
        let mut group = vec![i];
        for j in (i + 1)..n {
            if assigned[j] {
                continue;
            }
            if cosine_similarity(embeddings[i].as_ref(), embeddings[j].as_ref())? > threshold {
                assigned[j] = true;
                group.push(j);
            }
        }
        tracker.complete(i.to_string(), format!("seeded a group of {}", group.len()));
        groups.push(group);
    }

    tracker.finish(format!("{} groups from {} embeddings", groups.len(), n));
    Ok(groups)
}

/// Collect every article's embedding, failing on the first one without.
pub fn embeddings_of(articles: &[Article]) -> Result<Vec<&[f32]>, SimilarityError> {
    articles
        .iter()
        .map(|article| {
            article
                .embedding
                .as_deref()
                .ok_or_else(|| SimilarityError::MissingEmbedding(article.title.clone()))
        })
        .collect()
}

/// [`group_by_similarity`] over articles; indices refer to `articles`.
pub fn group_articles(articles: &[Article], threshold: f32) -> Result<Vec<Vec<usize>>, SimilarityError> {
    group_by_similarity(&embeddings_of(articles)?, threshold)
}

/// A candidate close enough to the target.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarArticle<'a> {
    pub article: &'a Article,
    pub similarity: f32,
}

/// Candidates whose similarity to `target` is strictly above `threshold`,
/// most similar first.
///
/// The target itself, candidates without an embedding and user-selected
/// candidates are skipped. Candidates sharing a title collapse into the most
/// similar one. A target without an embedding has no neighbours.
pub fn find_similar<'a>(
    target: &Article,
    candidates: &'a [Article],
    threshold: f32,
) -> Result<Vec<SimilarArticle<'a>>, SimilarityError> {
    let Some(target_embedding) = target.embedding.as_deref() else {
        return Ok(Vec::new());
    };

    let mut results: Vec<SimilarArticle<'a>> = Vec::new();
    let mut by_title: HashMap<&str, usize> = HashMap::new();

    for candidate in candidates {
        if candidate.id == target.id || candidate.user_selected {
            continue;
        }
        let Some(embedding) = candidate.embedding.as_deref() else {
            continue;
        };

        let similarity = cosine_similarity(target_embedding, embedding)?;
        if similarity <= threshold {
            continue;
        }

        match by_title.get(candidate.title.as_str()) {
            Some(&slot) => {
                if similarity > results[slot].similarity {
                    results[slot] = SimilarArticle {
                        article: candidate,
                        similarity,
                    };
                }
            }
            None => {
                by_title.insert(candidate.title.as_str(), results.len());
                results.push(SimilarArticle {
                    article: candidate,
                    similarity,
                });
            }
        }
    }

    // Stable sort keeps first-seen order among ties.
    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    Ok(results)
}
