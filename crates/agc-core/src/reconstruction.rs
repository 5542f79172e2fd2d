use serde::{Deserialize, Serialize};

use crate::{
    data::{EventBatch, Jet, Kinematics},
    selection::{apply_mask, object_selection, region_selections, ObjectCuts},
    utils::vectors::Vec4,
    AgcResult, B_TAG_THRESHOLD,
};

/// A hadronic top-quark candidate built from three distinct jets of one event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trijet {
    /// Positions of the three jets in the event's jet collection, in increasing order.
    pub indices: [usize; 3],
    /// Vector sum of the three jet four-momenta.
    pub p4: Vec4,
    /// Largest b-tag score among the three jets.
    pub max_btag: f64,
}

impl Trijet {
    pub fn new(jets: &[Jet], indices: [usize; 3]) -> Self {
        let p4 = indices.iter().map(|&i| jets[i].p4()).sum::<Vec4>();
        let max_btag = indices
            .iter()
            .map(|&i| jets[i].btag_csvv2)
            .fold(f64::NEG_INFINITY, f64::max);
        Self {
            indices,
            p4,
            max_btag,
        }
    }

    pub fn pt(&self) -> f64 {
        self.p4.pt()
    }

    pub fn mass(&self) -> f64 {
        self.p4.m()
    }
}

/// Every unordered three-jet combination, in lexicographic order of jet indices.
///
/// Events with fewer than three jets have no candidates.
pub fn trijet_candidates(jets: &[Jet]) -> Vec<Trijet> {
    let n = jets.len();
    let mut candidates = Vec::with_capacity(n.saturating_sub(2) * n.saturating_sub(1) * n / 6);
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                candidates.push(Trijet::new(jets, [i, j, k]));
            }
        }
    }
    candidates
}

/// The highest-$`p_T`$ candidate among those with at least one jet b-tagged above `threshold`.
///
/// When several candidates share the maximal $`p_T`$, the one generated first (lowest indices in
/// lexicographic order) is returned.
pub fn best_trijet(jets: &[Jet], threshold: f64) -> Option<Trijet> {
    trijet_candidates(jets)
        .into_iter()
        .filter(|candidate| candidate.max_btag > threshold)
        .fold(None, |best: Option<Trijet>, candidate| match best {
            Some(current) if !(candidate.pt() > current.pt()) => Some(current),
            _ => Some(candidate),
        })
}

/// Reconstruct the top-quark mass of each event with the given b-tag `threshold`.
///
/// Events without a surviving candidate are dropped, so the output may be shorter than the
/// input.
pub fn reconstruct_trijet_mass_with_threshold(
    jets_per_event: &[Vec<Jet>],
    threshold: f64,
) -> Vec<f64> {
    jets_per_event
        .iter()
        .filter_map(|jets| best_trijet(jets, threshold))
        .map(|trijet| trijet.mass())
        .collect()
}

/// Reconstruct the top-quark mass $`m_{bjj}`$ of each event as the invariant mass of the
/// highest-$`p_T`$ trijet containing a b-tagged jet.
///
/// Events without a surviving candidate contribute no entry.
pub fn reconstruct_trijet_mass(jets_per_event: &[Vec<Jet>]) -> Vec<f64> {
    reconstruct_trijet_mass_with_threshold(jets_per_event, B_TAG_THRESHOLD)
}

/// The scalar sum of jet $`p_T`$ in each event.
pub fn scalar_ht(jets_per_event: &[Vec<Jet>]) -> Vec<f64> {
    jets_per_event
        .iter()
        .map(|jets| jets.iter().map(|jet| jet.pt).sum())
        .collect()
}

/// Reconstruct $`m_{bjj}`$ straight from raw events with kinematic-only object cuts and a single
/// lepton, at least four jets, at least two b-tags event filter.
pub fn calculate_trijet_mass(batch: &EventBatch) -> AgcResult<Vec<f64>> {
    let (electrons, muons, jets) = object_selection(batch, &ObjectCuts::kinematic());
    let selections = region_selections(&electrons, &muons, &jets, B_TAG_THRESHOLD)?;
    let mask = selections.all(&["exactly_1l", "atleast_4j", "atleast_2b"])?;
    let jets = apply_mask(&jets, &mask)?;
    Ok(reconstruct_trijet_mass(&jets))
}
