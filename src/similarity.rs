//! Detection of geometric similarity between consecutively visited cells.
use crate::cell::Cell;
use fevalues_traits::Real;
use log::trace;
use serde::{Deserialize, Serialize};

/// Relation between the present cell and the cell visited before it.
///
/// Mappings may skip recomputing quantities that are invariant under the detected relation,
/// such as the Jacobian of a translated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellSimilarity {
    /// No relation is known.
    #[default]
    None,
    /// The cell is a translation of the previous cell.
    Translation,
    /// The cell is a translation of the previous cell with opposite orientation.
    InvertedTranslation,
    /// Cached data was modified and must not be reused for the next cell.
    InvalidNextCell,
}

/// Whether similarity between consecutive cells is exploited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimilarityDetection {
    Enabled,
    Disabled,
    /// Enabled unless the active rayon thread pool has more than one worker.
    ///
    /// With several workers each owning a context, the order in which cells are visited is not
    /// deterministic, and neither would be results that reuse data of the previous cell.
    #[default]
    Automatic,
}

impl SimilarityDetection {
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Enabled => true,
            Self::Disabled => false,
            Self::Automatic => rayon::current_num_threads() <= 1,
        }
    }
}

/// Classifies the relation between `previous` and `current`.
pub fn classify_similarity<T, C, const DIM: usize, const SPACEDIM: usize>(
    detection: SimilarityDetection,
    previous: Option<&C>,
    previous_similarity: CellSimilarity,
    current: &C,
) -> CellSimilarity
where
    T: Real,
    C: Cell<T, SPACEDIM>,
{
    if !detection.is_enabled() {
        return CellSimilarity::None;
    }

    let similarity = match previous {
        Some(previous) if previous_similarity != CellSimilarity::InvalidNextCell => {
            if current.is_translation_of(previous) {
                if DIM < SPACEDIM && current.direction_flag() != previous.direction_flag() {
                    CellSimilarity::InvertedTranslation
                } else {
                    CellSimilarity::Translation
                }
            } else {
                CellSimilarity::None
            }
        }
        _ => CellSimilarity::None,
    };
    trace!("Cell similarity: {:?}", similarity);
    similarity
}
