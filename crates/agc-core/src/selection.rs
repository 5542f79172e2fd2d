use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Electron, EventBatch, Jagged, Jet, Muon},
    AgcError, AgcResult, B_TAG_THRESHOLD,
};

/// Remove the objects failing `predicate` from every event, keeping the order of survivors.
///
/// The output has the same number of events as `collection`, and each event holds at most as
/// many objects as it did before.
pub fn filter_objects<T, P>(collection: &[Vec<T>], predicate: P) -> Jagged<T>
where
    T: Clone,
    P: Fn(&T) -> bool,
{
    collection
        .iter()
        .map(|objects| objects.iter().filter(|&o| predicate(o)).cloned().collect())
        .collect()
}

/// Keep the entries of `items` whose mask entry is `true`.
pub fn apply_mask<T: Clone>(items: &[T], mask: &[bool]) -> AgcResult<Vec<T>> {
    if items.len() != mask.len() {
        return Err(AgcError::LengthMismatch {
            context: "Selection mask".to_string(),
            expected: items.len(),
            actual: mask.len(),
        });
    }
    Ok(items
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(item, _)| item.clone())
        .collect())
}

/// An object-level requirement.
pub trait Selector<T> {
    fn accepts(&self, object: &T) -> bool;
}

/// Requirements on selected electrons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectronCuts {
    pub min_pt: f64,
    pub max_abs_eta: f64,
    /// Required cut-based identification working point, if any.
    pub cut_based: Option<i32>,
    pub max_sip3d: f64,
}

impl Default for ElectronCuts {
    fn default() -> Self {
        Self {
            min_pt: 30.0,
            max_abs_eta: 2.1,
            cut_based: Some(4),
            max_sip3d: 4.0,
        }
    }
}

impl Selector<Electron> for ElectronCuts {
    fn accepts(&self, electron: &Electron) -> bool {
        electron.pt > self.min_pt
            && electron.eta.abs() < self.max_abs_eta
            && self.cut_based.map_or(true, |id| electron.cut_based == id)
            && electron.sip3d < self.max_sip3d
    }
}

/// Requirements on selected muons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MuonCuts {
    pub min_pt: f64,
    pub max_abs_eta: f64,
    pub require_tight_id: bool,
    pub max_sip3d: f64,
    pub max_pf_rel_iso: f64,
}

impl Default for MuonCuts {
    fn default() -> Self {
        Self {
            min_pt: 30.0,
            max_abs_eta: 2.1,
            require_tight_id: true,
            max_sip3d: 4.0,
            max_pf_rel_iso: 0.15,
        }
    }
}

impl Selector<Muon> for MuonCuts {
    fn accepts(&self, muon: &Muon) -> bool {
        muon.pt > self.min_pt
            && muon.eta.abs() < self.max_abs_eta
            && (muon.tight_id || !self.require_tight_id)
            && muon.sip3d < self.max_sip3d
            && muon.pf_rel_iso04_all < self.max_pf_rel_iso
    }
}

/// Requirements on selected jets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JetCuts {
    pub min_pt: f64,
    pub max_abs_eta: f64,
    pub require_tight_lepton_veto: bool,
}

impl Default for JetCuts {
    fn default() -> Self {
        Self {
            min_pt: 30.0,
            max_abs_eta: 2.4,
            require_tight_lepton_veto: true,
        }
    }
}

impl Selector<Jet> for JetCuts {
    fn accepts(&self, jet: &Jet) -> bool {
        jet.pt > self.min_pt
            && jet.eta.abs() < self.max_abs_eta
            && (jet.is_tight_lepton_veto() || !self.require_tight_lepton_veto)
    }
}

/// The object-level requirements applied by [`object_selection`].
///
/// The [`Default`] values are the tight selection of the reference ttbar analysis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectCuts {
    pub electron: ElectronCuts,
    pub muon: MuonCuts,
    pub jet: JetCuts,
}

impl ObjectCuts {
    /// Create a new [`Default`] set of [`ObjectCuts`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The looser kinematic-only selection (no identification, isolation, or impact parameter
    /// requirements) with a 25 GeV jet threshold.
    pub fn kinematic() -> Self {
        Self {
            electron: ElectronCuts {
                cut_based: None,
                max_sip3d: f64::INFINITY,
                ..Default::default()
            },
            muon: MuonCuts {
                require_tight_id: false,
                max_sip3d: f64::INFINITY,
                max_pf_rel_iso: f64::INFINITY,
                ..Default::default()
            },
            jet: JetCuts {
                min_pt: 25.0,
                require_tight_lepton_veto: false,
                ..Default::default()
            },
        }
    }

    pub fn electron(mut self, cuts: ElectronCuts) -> Self {
        self.electron = cuts;
        self
    }

    pub fn muon(mut self, cuts: MuonCuts) -> Self {
        self.muon = cuts;
        self
    }

    pub fn jet(mut self, cuts: JetCuts) -> Self {
        self.jet = cuts;
        self
    }
}

/// Apply `cuts` to every collection of `batch`, returning the surviving electrons, muons and jets.
pub fn object_selection(
    batch: &EventBatch,
    cuts: &ObjectCuts,
) -> (Jagged<Electron>, Jagged<Muon>, Jagged<Jet>) {
    (
        filter_objects(&batch.electrons(), |e| cuts.electron.accepts(e)),
        filter_objects(&batch.muons(), |m| cuts.muon.accepts(m)),
        filter_objects(&batch.jets(), |j| cuts.jet.accepts(j)),
    )
}

/// A set of named per-event boolean masks of a common length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedSelection {
    n_events: Option<usize>,
    masks: IndexMap<String, Vec<bool>>,
}

impl PackedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mask` under `name`, replacing any previous mask with that name.
    pub fn add<S: Into<String>>(&mut self, name: S, mask: Vec<bool>) -> AgcResult<()> {
        let name = name.into();
        match self.n_events {
            Some(n_events) if n_events != mask.len() => {
                return Err(AgcError::LengthMismatch {
                    context: format!("Selection '{name}'"),
                    expected: n_events,
                    actual: mask.len(),
                })
            }
            None => self.n_events = Some(mask.len()),
            _ => {}
        }
        self.masks.insert(name, mask);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[bool]> {
        self.masks.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.masks.keys().map(String::as_str)
    }

    /// The logical AND of the named masks.
    pub fn all(&self, names: &[&str]) -> AgcResult<Vec<bool>> {
        let masks = names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    AgcError::Custom(format!("No selection named '{name}' has been added"))
                })
            })
            .collect::<AgcResult<Vec<_>>>()?;
        let n_events = self.n_events.unwrap_or(0);
        Ok((0..n_events)
            .map(|event| masks.iter().all(|mask| mask[event]))
            .collect())
    }
}

/// Build every intermediate and composite region mask with the given b-tag `threshold`.
///
/// Registered names: `exactly_1l`, `atleast_4j`, `exactly_1b`, `atleast_2b`, `4j1b`, `4j2b`.
pub fn region_selections(
    electrons: &[Vec<Electron>],
    muons: &[Vec<Muon>],
    jets: &[Vec<Jet>],
    threshold: f64,
) -> AgcResult<PackedSelection> {
    for (name, len) in [("muons", muons.len()), ("jets", jets.len())] {
        if len != electrons.len() {
            return Err(AgcError::LengthMismatch {
                context: format!("Number of events in {name}"),
                expected: electrons.len(),
                actual: len,
            });
        }
    }
    let lepton_counts: Vec<usize> = electrons
        .iter()
        .zip(muons)
        .map(|(e, m)| e.len() + m.len())
        .collect();
    let b_tagged_counts: Vec<usize> = jets
        .iter()
        .map(|event| event.iter().filter(|j| j.is_btagged(threshold)).count())
        .collect();

    let mut selections = PackedSelection::new();
    selections.add(
        "exactly_1l",
        lepton_counts.iter().map(|&n| n == 1).collect(),
    )?;
    selections.add("atleast_4j", jets.iter().map(|j| j.len() >= 4).collect())?;
    selections.add(
        "exactly_1b",
        b_tagged_counts.iter().map(|&n| n == 1).collect(),
    )?;
    selections.add(
        "atleast_2b",
        b_tagged_counts.iter().map(|&n| n >= 2).collect(),
    )?;
    let four_jets_one_tag = selections.all(&["exactly_1l", "atleast_4j", "exactly_1b"])?;
    selections.add("4j1b", four_jets_one_tag)?;
    let four_jets_two_tags = selections.all(&["exactly_1l", "atleast_4j", "atleast_2b"])?;
    selections.add("4j2b", four_jets_two_tags)?;
    Ok(selections)
}

/// Compute the `4j1b` and `4j2b` event masks from already-selected objects.
pub fn region_selection(
    electrons: &[Vec<Electron>],
    muons: &[Vec<Muon>],
    jets: &[Vec<Jet>],
) -> AgcResult<(Vec<bool>, Vec<bool>)> {
    let selections = region_selections(electrons, muons, jets, B_TAG_THRESHOLD)?;
    Ok((selections.all(&["4j1b"])?, selections.all(&["4j2b"])?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{test_event, test_jet};

    fn jets_with_tags(tags: &[f64]) -> Vec<Jet> {
        tags.iter()
            .map(|&b| test_jet(50.0, 0.0, 0.0, 5.0, b))
            .collect()
    }

    fn one_muon() -> Vec<Muon> {
        test_event().muons
    }

    #[test]
    fn test_filter_keeps_order_and_jaggedness() {
        let collection = vec![vec![5, 1, 8, 3], vec![], vec![2]];
        let filtered = filter_objects(&collection, |x: &i32| *x > 2);
        assert_eq!(filtered, vec![vec![5, 8, 3], vec![], vec![]]);
        for (before, after) in collection.iter().zip(&filtered) {
            assert!(after.len() <= before.len());
        }
    }

    #[test]
    fn test_filter_uses_absolute_eta() {
        let cuts = JetCuts::default();
        let jets = vec![vec![
            test_jet(40.0, -2.5, 0.0, 5.0, 0.0),
            test_jet(40.0, -2.3, 0.0, 5.0, 0.0),
            test_jet(30.0, 0.0, 0.0, 5.0, 0.0),
        ]];
        let filtered = filter_objects(&jets, |j| cuts.accepts(j));
        assert_eq!(filtered[0].len(), 1);
        assert_eq!(filtered[0][0].eta, -2.3);
    }

    #[test]
    fn test_nan_fails_every_cut() {
        let jet = test_jet(f64::NAN, 0.0, 0.0, 5.0, 0.9);
        assert!(!JetCuts::default().accepts(&jet));
    }

    #[test]
    fn test_default_object_selection() {
        let batch = EventBatch::new(vec![test_event()]);
        let (electrons, muons, jets) = object_selection(&batch, &ObjectCuts::default());
        assert!(electrons[0].is_empty());
        assert_eq!(muons[0].len(), 1);
        assert_eq!(jets[0].len(), 4);
    }

    #[test]
    fn test_kinematic_selection_is_looser() {
        let mut event = test_event();
        event.muons[0].tight_id = false;
        event.jets[3].pt = 27.0;
        event.jets[3].jet_id = 0;
        let batch = EventBatch::new(vec![event]);
        let (_, tight_muons, tight_jets) = object_selection(&batch, &ObjectCuts::default());
        let (_, loose_muons, loose_jets) = object_selection(&batch, &ObjectCuts::kinematic());
        assert!(tight_muons[0].is_empty());
        assert_eq!(loose_muons[0].len(), 1);
        assert_eq!(tight_jets[0].len(), 3);
        assert_eq!(loose_jets[0].len(), 4);
    }

    #[test]
    fn test_region_masks() {
        let electrons = vec![vec![], vec![], vec![], vec![]];
        let muons = vec![one_muon(), one_muon(), vec![], one_muon()];
        let jets = vec![
            jets_with_tags(&[0.9, 0.1, 0.2, 0.3]),
            jets_with_tags(&[0.9, 0.6, 0.2, 0.3, 0.1]),
            jets_with_tags(&[0.9, 0.6, 0.2, 0.3]),
            jets_with_tags(&[0.9, 0.6, 0.2]),
        ];
        let (one_tag, two_tags) = region_selection(&electrons, &muons, &jets).unwrap();
        assert_eq!(one_tag, vec![true, false, false, false]);
        assert_eq!(two_tags, vec![false, true, false, false]);
    }

    #[test]
    fn test_regions_are_mutually_exclusive() {
        let mut rng = fastrand::Rng::with_seed(17);
        let n_events = 200;
        let electrons: Vec<Vec<Electron>> = (0..n_events)
            .map(|i| if i % 3 == 0 { test_event().electrons } else { vec![] })
            .collect();
        let muons: Vec<Vec<Muon>> = (0..n_events)
            .map(|i| if i % 2 == 0 { one_muon() } else { vec![] })
            .collect();
        let jets: Vec<Vec<Jet>> = (0..n_events)
            .map(|i| {
                let tags: Vec<f64> = (0..(i % 7)).map(|_| rng.f64()).collect();
                jets_with_tags(&tags)
            })
            .collect();
        let (one_tag, two_tags) = region_selection(&electrons, &muons, &jets).unwrap();
        assert_eq!(one_tag.len(), n_events);
        assert_eq!(two_tags.len(), n_events);
        assert!(one_tag.iter().zip(&two_tags).all(|(a, b)| !(a & b)));
    }

    #[test]
    fn test_threshold_is_strict() {
        let jets = vec![jets_with_tags(&[0.5, 0.5, 0.5, 0.9])];
        let selections =
            region_selections(&[vec![]], &[one_muon()], &jets, B_TAG_THRESHOLD).unwrap();
        assert_eq!(selections.get("exactly_1b"), Some(&[true][..]));
        assert_eq!(selections.get("4j1b"), Some(&[true][..]));
    }

    #[test]
    fn test_packed_selection_rejects_wrong_length() {
        let mut selections = PackedSelection::new();
        selections.add("a", vec![true, false]).unwrap();
        assert!(selections.add("b", vec![true]).is_err());
        assert!(selections.all(&["missing"]).is_err());
        assert_eq!(selections.names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_apply_mask() {
        let kept = apply_mask(&[1, 2, 3], &[true, false, true]).unwrap();
        assert_eq!(kept, vec![1, 3]);
        assert!(apply_mask(&[1, 2], &[true]).is_err());
    }
}
