use kmeans_colors::get_kmeans;
use palette::Srgb;
use std::collections::HashSet;

/// `kmeans_colors` stores cluster indices as `u8`.
const MAX_CLUSTERS: usize = u8::MAX as usize;

pub struct KMeans {
    clusters: usize,
    attempts: usize,
    max_iterations: usize,
    epsilon: f32,
    seed: u64,
}

/// The result of the best clustering run. `counts[i]` is the number of pixels assigned to `centroids[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub centroids: Vec<Srgb<u8>>,
    pub counts: Vec<u32>,
    pub score: f32,
}

impl KMeans {
    /// `epsilon` is the centroid shift, in 8-bit channel units, under which a run counts as converged.
    pub fn new(clusters: usize, attempts: usize, max_iterations: usize, epsilon: f32, seed: u64) -> Self {
        Self {
            clusters,
            attempts: attempts.max(1),
            max_iterations: max_iterations.max(1),
            epsilon,
            seed,
        }
    }

    /// Cluster the pixels `attempts` times with k-means++ seeds derived from the configured seed, keeping the run
    /// with the lowest score. Ties keep the earliest run.
    pub fn run(&self, pixels: &[Srgb<u8>]) -> Clustering {
        let distinct: HashSet<(u8, u8, u8)> = pixels.iter().map(|p| p.into_components()).collect();
        let clusters = self.clusters.min(distinct.len()).min(MAX_CLUSTERS);

        if clusters == 0 {
            return Clustering {
                centroids: Vec::new(),
                counts: Vec::new(),
                score: 0.0,
            };
        }

        let buf: Vec<Srgb> = pixels.iter().map(|p| p.into_format()).collect();
        let converge = (self.epsilon / u8::MAX as f32).powi(2);

        let best = (0..self.attempts as u64)
            .map(|attempt| {
                get_kmeans(
                    clusters,
                    self.max_iterations,
                    converge,
                    false,
                    &buf,
                    self.seed.wrapping_add(attempt),
                )
            })
            .reduce(|best, run| if run.score < best.score { run } else { best });

        let Some(best) = best else {
            return Clustering {
                centroids: Vec::new(),
                counts: Vec::new(),
                score: 0.0,
            };
        };

        let mut counts = vec![0u32; best.centroids.len()];
        for &index in &best.indices {
            counts[index as usize] += 1;
        }

        Clustering {
            centroids: best.centroids.iter().map(|c| c.into_format()).collect(),
            counts,
            score: best.score,
        }
    }
}
