/*!
 * Binding per-line translations back onto the original items.
 */

use std::collections::BTreeMap;

use crate::subtitle_processor::SubtitleItem;

use super::grouping::SubtitleGroup;

/// Translations keyed by position in the original item sequence
pub type TranslationMap = BTreeMap<usize, String>;

/// Lines of one group, bound to their positions
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledGroup {
    /// `(position, text)` for every member, in group order
    pub lines: Vec<(usize, String)>,

    /// Members that received their own source text
    pub fallback_lines: usize,
}

/// Bind `translations` to the group's members by position
///
/// Missing or blank entries fall back to the member's source text. Extra
/// entries are ignored.
pub fn assemble_group(group: &SubtitleGroup, translations: &[String]) -> AssembledGroup {
    let mut fallback_lines = 0;
    let lines = group
        .member_indices()
        .iter()
        .zip(group.texts())
        .enumerate()
        .map(|(i, (&position, source))| {
            match translations.get(i).filter(|t| !t.trim().is_empty()) {
                Some(translated) => (position, translated.clone()),
                None => {
                    fallback_lines += 1;
                    (position, source.clone())
                }
            }
        })
        .collect();

    AssembledGroup { lines, fallback_lines }
}

/// Writes a translation map onto items in place
pub struct TranslationMerger;

impl TranslationMerger {
    /// Assign `translated` for every position present in `translations`
    ///
    /// Returns how many items were assigned; absent positions keep their
    /// current value.
    pub fn merge(items: &mut [SubtitleItem], translations: &TranslationMap) -> usize {
        let mut assigned = 0;
        for (position, item) in items.iter_mut().enumerate() {
            if let Some(text) = translations.get(&position) {
                item.translated = Some(text.clone());
                assigned += 1;
            }
        }
        assigned
    }
}
