/*!
 * Time-gap grouping of subtitle lines.
 *
 * Consecutive lines whose gap is at most the threshold are translated
 * together so the model sees the surrounding dialogue.
 */

use crate::subtitle_processor::SubtitleItem;

/// A temporally contiguous run of lines translated in one request
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleGroup {
    member_indices: Vec<usize>,
    texts: Vec<String>,
}

impl SubtitleGroup {
    fn single(index: usize, text: &str) -> Self {
        Self {
            member_indices: vec![index],
            texts: vec![text.to_string()],
        }
    }

    fn push(&mut self, index: usize, text: &str) {
        self.member_indices.push(index);
        self.texts.push(text.to_string());
    }

    /// Build a group from `(position, text)` pairs
    ///
    /// Returns `None` when the pairs are empty or the positions are not
    /// strictly increasing.
    pub fn from_pairs<I, S>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        let (member_indices, texts): (Vec<usize>, Vec<String>) =
            pairs.into_iter().map(|(i, s)| (i, s.into())).unzip();

        if member_indices.is_empty() || member_indices.windows(2).any(|w| w[0] >= w[1]) {
            return None;
        }
        Some(Self { member_indices, texts })
    }

    /// Positions of the members in the original item sequence
    pub fn member_indices(&self) -> &[usize] {
        &self.member_indices
    }

    /// Source texts, parallel to `member_indices`
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn len(&self) -> usize {
        self.member_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_indices.is_empty()
    }
}

/// Gap-based grouper
#[derive(Debug, Clone, Copy)]
pub struct TimeGrouper {
    max_gap_seconds: f64,
}

impl TimeGrouper {
    pub fn new(max_gap_seconds: f64) -> Self {
        Self { max_gap_seconds }
    }

    /// Split items into groups in a single greedy pass
    pub fn group(&self, items: &[SubtitleItem]) -> Vec<SubtitleGroup> {
        let Some(first) = items.first() else {
            return Vec::new();
        };

        let mut groups = vec![SubtitleGroup::single(0, &first.text)];

        for (i, pair) in items.windows(2).enumerate() {
            let (prev, current) = (&pair[0], &pair[1]);
            // Overlapping cues saturate to a zero gap
            let gap = current.start_at.saturating_sub(prev.end_at).as_secs_f64();

            if gap <= self.max_gap_seconds {
                if let Some(last) = groups.last_mut() {
                    last.push(i + 1, &current.text);
                }
            } else {
                groups.push(SubtitleGroup::single(i + 1, &current.text));
            }
        }

        groups
    }
}

/// Group items with the given gap threshold
pub fn group_by_time(items: &[SubtitleItem], max_gap_seconds: f64) -> Vec<SubtitleGroup> {
    TimeGrouper::new(max_gap_seconds).group(items)
}
