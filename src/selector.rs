use crate::corpus;
use crate::store::OutcomeStore;
use rand::Rng;
use std::collections::HashSet;
use std::path::PathBuf;

/// Display limit the Ads API enforces on headlines.
pub const MAX_HEADLINE_CHARS: usize = 40;
const TRUNCATED_CHARS: usize = 37;

/// Picks fresh headlines from a depletable pool.
///
/// The pool is loaded lazily from the corpus file and refilled when it runs
/// dry. A headline handed out in the current cycle is removed from the pool
/// so it is not offered twice, even across different creatives.
pub struct HeadlineSelector {
    corpus_path: PathBuf,
    pool: Vec<String>,
}

impl HeadlineSelector {
    pub fn new(corpus_path: PathBuf) -> Self {
        Self {
            corpus_path,
            pool: Vec::new(),
        }
    }

    /// Select a headline for one creative, avoiding everything the ledger
    /// records as used for it plus its current headline.
    ///
    /// Always produces a value: when every candidate is excluded the corpus
    /// is reloaded, and when even that leaves nothing the full pool is
    /// offered again, accepting repetition rather than stalling.
    pub async fn select(
        &mut self,
        store: &OutcomeStore,
        creative_id: &str,
        current_headline: Option<&str>,
    ) -> String {
        if self.pool.is_empty() {
            self.reload();
        }

        let used = match store.used_headlines(creative_id).await {
            Ok(used) => used,
            Err(e) => {
                tracing::warn!(
                    "could not load used headlines for {creative_id}, selecting without history: {e}"
                );
                HashSet::new()
            }
        };

        let mut candidates =
            self.candidate_indices(|h| !used.contains(h) && Some(h) != current_headline);

        if candidates.is_empty() {
            tracing::warn!("no unused headlines left for {creative_id}, reloading the corpus");
            self.reload();
            candidates = self.candidate_indices(|h| Some(h) != current_headline);
        }

        if candidates.is_empty() {
            tracing::warn!("headline corpus exhausted for {creative_id}, accepting repetition");
            candidates = (0..self.pool.len()).collect();
        }

        if candidates.is_empty() {
            // Corpus file unreadable or empty; nothing to offer.
            tracing::error!(
                "headline corpus at {} has no entries, keeping current headline",
                self.corpus_path.display()
            );
            return current_headline.unwrap_or_default().to_string();
        }

        let slot = rand::rng().random_range(0..candidates.len());
        let picked = self.pool.swap_remove(candidates[slot]);
        tracing::debug!("selected headline for {creative_id}: {picked}");
        truncate_for_display(picked)
    }

    fn candidate_indices(&self, keep: impl Fn(&str) -> bool) -> Vec<usize> {
        self.pool
            .iter()
            .enumerate()
            .filter(|(_, headline)| keep(headline))
            .map(|(i, _)| i)
            .collect()
    }

    fn reload(&mut self) {
        match corpus::load(&self.corpus_path) {
            Ok(headlines) => {
                tracing::info!(
                    "loaded {} headlines from {}",
                    headlines.len(),
                    self.corpus_path.display()
                );
                self.pool = headlines;
            }
            Err(e) => tracing::warn!("failed to reload headline corpus: {e:#}"),
        }
    }
}

fn truncate_for_display(headline: String) -> String {
    if headline.chars().count() <= MAX_HEADLINE_CHARS {
        return headline;
    }
    let mut truncated: String = headline.chars().take(TRUNCATED_CHARS).collect();
    truncated.push_str("...");
    truncated
}
