//! Playlist : rotation order built once per session

use crate::media::MediaEntry;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::debug;

/// Immutable rotation order.
///
/// Indexing is circular: `get(i)` wraps modulo the length, so the playlist
/// describes an infinite rotation. Cloning is cheap, the entries are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    entries: Arc<[MediaEntry]>,
}

impl Playlist {
    /// Wraps an already ordered list of entries.
    pub fn from_entries(entries: Vec<MediaEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// An empty playlist; the scheduler stays idle on it.
    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index` modulo the length, `None` on an empty playlist.
    pub fn get(&self, index: usize) -> Option<&MediaEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.get(index % self.entries.len())
    }

    /// Position following `index` in the rotation.
    pub fn next_index(&self, index: usize) -> usize {
        if self.entries.is_empty() {
            0
        } else {
            (index + 1) % self.entries.len()
        }
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }
}

/// Builds the session playlist: leading videos in their given order, then a
/// uniformly shuffled copy of the image catalog.
///
/// The random source is injected so that a seeded generator reproduces the
/// same order. Build once per session; rebuilding mid-session would reshuffle.
#[derive(Debug, Clone, Default)]
pub struct PlaylistBuilder {
    leading: Vec<MediaEntry>,
    catalog: Vec<MediaEntry>,
}

impl PlaylistBuilder {
    pub fn new(leading: Vec<MediaEntry>, catalog: Vec<MediaEntry>) -> Self {
        Self { leading, catalog }
    }

    /// Convenience constructor from raw sources: `leading` become videos,
    /// `images` become images.
    pub fn from_sources<L, I>(leading: L, images: I) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            leading: leading.into_iter().map(MediaEntry::video).collect(),
            catalog: images.into_iter().map(MediaEntry::image).collect(),
        }
    }

    /// Builds the playlist with the given random source.
    ///
    /// The catalog is permuted with a Fisher-Yates shuffle, every permutation
    /// being equally likely for an unbiased generator.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Playlist {
        let mut shuffled = self.catalog.clone();
        shuffled.shuffle(rng);

        let mut entries = Vec::with_capacity(self.leading.len() + shuffled.len());
        entries.extend(self.leading.iter().cloned());
        entries.extend(shuffled);

        debug!(
            leading = self.leading.len(),
            images = self.catalog.len(),
            "Playlist built"
        );
        Playlist::from_entries(entries)
    }

    /// Builds the playlist with a generator seeded from `seed`.
    pub fn build_seeded(&self, seed: u64) -> Playlist {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build(&mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn catalog(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("/assets/images/{i}.jpg")).collect()
    }

    fn counts(entries: &[MediaEntry]) -> HashMap<&MediaEntry, usize> {
        let mut map = HashMap::new();
        for entry in entries {
            *map.entry(entry).or_insert(0) += 1;
        }
        map
    }

    #[test]
    fn test_leading_videos_come_first_in_order() {
        let builder = PlaylistBuilder::from_sources(["v1.mp4", "v2.mp4"], catalog(10));
        let playlist = builder.build_seeded(3);

        assert_eq!(playlist.len(), 12);
        assert_eq!(playlist.get(0), Some(&MediaEntry::video("v1.mp4")));
        assert_eq!(playlist.get(1), Some(&MediaEntry::video("v2.mp4")));
        assert!(playlist.entries()[2..].iter().all(MediaEntry::is_image));
    }

    #[test]
    fn test_tail_is_permutation_of_catalog() {
        let images = catalog(50);
        let builder = PlaylistBuilder::from_sources(["intro.mp4"], images.clone());

        for seed in 0..20 {
            let playlist = builder.build_seeded(seed);
            let expected: Vec<MediaEntry> = images.iter().map(MediaEntry::image).collect();
            assert_eq!(playlist.len(), 1 + images.len());
            assert_eq!(counts(&playlist.entries()[1..]), counts(&expected));
        }
    }

    #[test]
    fn test_seeded_builds_are_reproducible() {
        let builder = PlaylistBuilder::from_sources(Vec::<String>::new(), catalog(30));

        assert_eq!(builder.build_seeded(99), builder.build_seeded(99));
    }

    #[test]
    fn test_shuffle_produces_every_permutation() {
        let builder = PlaylistBuilder::from_sources(Vec::<String>::new(), catalog(3));
        let mut seen = HashMap::new();
        for seed in 0..200 {
            let playlist = builder.build_seeded(seed);
            let order: Vec<String> = playlist.entries().iter().map(|e| e.source.clone()).collect();
            *seen.entry(order).or_insert(0) += 1;
        }

        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_empty_catalog_gives_empty_playlist() {
        let playlist = PlaylistBuilder::default().build(&mut rand::rng());

        assert!(playlist.is_empty());
        assert_eq!(playlist.get(0), None);
        assert_eq!(playlist.next_index(0), 0);
    }

    #[test]
    fn test_empty_catalog_keeps_leading_videos() {
        let playlist = PlaylistBuilder::from_sources(["/v1.mp4", "/v2.mp4"], Vec::<String>::new())
            .build(&mut rand::rng());

        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.get(0), Some(&MediaEntry::video("/v1.mp4")));
        assert_eq!(playlist.get(1), Some(&MediaEntry::video("/v2.mp4")));
        assert_eq!(playlist.next_index(1), 0);
    }

    #[test]
    fn test_circular_indexing() {
        let playlist = Playlist::from_entries(vec![
            MediaEntry::video("a"),
            MediaEntry::image("b"),
            MediaEntry::image("c"),
        ]);

        assert_eq!(playlist.get(3), playlist.get(0));
        assert_eq!(playlist.get(7), playlist.get(1));
        assert_eq!(playlist.next_index(2), 0);
    }
}
