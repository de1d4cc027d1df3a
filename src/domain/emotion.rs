//! Emotion labels and per-face confidence maps.
//!
//! [`EmotionScores`] keeps the detector's own key order. The order matters:
//! it is the order the map is serialized in, and it breaks ties when picking
//! the dominant label.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The fixed label set produced by the bundled emotion classifier.
///
/// Declaration order matches the classifier's output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    /// Anger.
    Angry,
    /// Disgust.
    Disgust,
    /// Fear.
    Fear,
    /// Happiness.
    Happy,
    /// Sadness.
    Sad,
    /// Surprise.
    Surprise,
    /// No discernible emotion.
    Neutral,
}

impl Emotion {
    /// All labels in classifier output order.
    pub const ALL: [Self; 7] = [
        Self::Angry,
        Self::Disgust,
        Self::Fear,
        Self::Happy,
        Self::Sad,
        Self::Surprise,
        Self::Neutral,
    ];

    /// Returns the wire label (lowercase).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence per emotion label for one detected face.
///
/// Insertion-ordered. Serializes as a JSON object whose keys appear in
/// insertion order. Inserting an existing label overwrites its score in
/// place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionScores {
    entries: Vec<(String, f64)>,
}

impl EmotionScores {
    /// Creates an empty score map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the score for `label`, keeping its original position if present.
    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        let label = label.into();
        if let Some(entry) = self.entries.iter_mut().find(|(l, _)| *l == label) {
            entry.1 = score;
        } else {
            self.entries.push((label, score));
        }
    }

    /// Returns the score for `label`, if present.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, score)| *score)
    }

    /// Iterates `(label, score)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no label has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the label with the highest score.
    ///
    /// Scans in insertion order and only replaces the current best on a
    /// strictly greater score, so the first label wins exact ties. A `NaN`
    /// never displaces the current best. Returns `None` for an empty map.
    #[must_use]
    pub fn dominant(&self) -> Option<&str> {
        let mut entries = self.entries.iter();
        let (first_label, first_score) = entries.next()?;
        let (mut best_label, mut best_score) = (first_label, *first_score);
        for (label, score) in entries {
            if *score > best_score {
                best_label = label;
                best_score = *score;
            }
        }
        Some(best_label.as_str())
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (L, f64)>>(iter: I) -> Self {
        let mut scores = Self::new();
        for (label, score) in iter {
            scores.insert(label, score);
        }
        scores
    }
}

impl Serialize for EmotionScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, score) in &self.entries {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}
