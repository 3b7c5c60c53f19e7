use nd_progress::{CancellationToken, JobTracker, ProgressSender};
use serde::Serialize;

use super::{check_dimensions, cosine_similarity};
use crate::error::SimilarityError;

/// One agglomeration step. Leaves are numbered `0..n`; the cluster created
/// by step `k` is numbered `n + k`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f32,
    /// Leaves under the new cluster.
    pub size: usize,
}

/// Pairwise `1 - cos` distances, clamped at zero.
pub fn cosine_distance_matrix<V: AsRef<[f32]>>(embeddings: &[V]) -> Result<Vec<Vec<f32>>, SimilarityError> {
    check_dimensions(embeddings)?;
    let n = embeddings.len();
    let mut matrix = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let distance = (1.0 - cosine_similarity(embeddings[i].as_ref(), embeddings[j].as_ref())?).max(0.0);
            matrix[i][j] = distance;
            matrix[j][i] = distance;
        }
    }
    Ok(matrix)
}

/// Average-linkage (UPGMA) hierarchical clustering over cosine distance.
///
/// Returns `n - 1` merges for `n` leaves. Among equally distant pairs the one
/// found first in row-major slot order merges first.
pub fn average_linkage<V: AsRef<[f32]>>(embeddings: &[V]) -> Result<Vec<Merge>, SimilarityError> {
    average_linkage_tracked(embeddings, ProgressSender::disabled(), &CancellationToken::new())
}

/// [`average_linkage`] reporting one progress item per merge and checking
/// `cancel` before each one.
pub fn average_linkage_tracked<V: AsRef<[f32]>>(
    embeddings: &[V],
    progress: ProgressSender,
    cancel: &CancellationToken,
) -> Result<Vec<Merge>, SimilarityError> {
    let n = embeddings.len();
    let steps = n.saturating_sub(1);
    let mut distances: Vec<Vec<f64>> = cosine_distance_matrix(embeddings)?
        .into_iter()
        .map(|row| row.into_iter().map(f64::from).collect())
        .collect();

    // Slot i holds (cluster id, leaf count) while active.
    let mut slots: Vec<Option<(usize, usize)>> = (0..n).map(|i| Some((i, 1))).collect();
    let mut merges = Vec::with_capacity(steps);
    let mut tracker = JobTracker::new(steps, progress);
    tracker.start(format!("Clustering {} embeddings", n));

    for step in 0..steps {
        if cancel.is_cancelled() {
            tracker.cancel(format!("Clustering cancelled after {}/{} merges", step, steps));
            return Err(SimilarityError::Cancelled { completed: step, total: steps });
        }

        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if slots[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if slots[j].is_none() {
                    continue;
                }
                let d = distances[i][j];
                if best.map_or(true, |(_, _, current)| d < current) {
                    best = Some((i, j, d));
                }
            }
        }

        let Some((i, j, distance)) = best else {
            break;
        };
        let (Some((id_i, size_i)), Some((id_j, size_j))) = (slots[i], slots[j]) else {
            break;
        };

        for m in 0..n {
            if m == i || m == j || slots[m].is_none() {
                continue;
            }
            let merged = (size_i as f64 * distances[i][m] + size_j as f64 * distances[j][m])
                / (size_i + size_j) as f64;
            distances[i][m] = merged;
            distances[m][i] = merged;
        }

        let size = size_i + size_j;
        merges.push(Merge {
            left: id_i.min(id_j),
            right: id_i.max(id_j),
            distance: distance as f32,
            size,
        });
        slots[i] = Some((n + step, size));
        slots[j] = None;
        tracker.complete((n + step).to_string(), format!("merged {} + {} at {:.4}", id_i, id_j, distance));
    }

    tracker.finish(format!("{} merges", merges.len()));
    Ok(merges)
}
