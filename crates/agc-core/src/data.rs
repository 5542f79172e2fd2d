use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    compare::Value, source::ColumnarSource, utils::enums::ObjectKind, utils::vectors::Vec4,
    AgcError, AgcResult,
};

/// One inner sequence per event; inner lengths are data-dependent.
pub type Jagged<T> = Vec<Vec<T>>;

/// Collider kinematics shared by every reconstructed object.
pub trait Kinematics {
    fn pt(&self) -> f64;
    fn eta(&self) -> f64;
    fn phi(&self) -> f64;
    fn mass(&self) -> f64;
    /// The four-momentum `(px, py, pz, E)` of the object.
    fn p4(&self) -> Vec4 {
        Vec4::from_pt_eta_phi_mass(self.pt(), self.eta(), self.phi(), self.mass())
    }
}

macro_rules! impl_kinematics {
    ($($t:ty),*) => {
        $(impl Kinematics for $t {
            fn pt(&self) -> f64 {
                self.pt
            }
            fn eta(&self) -> f64 {
                self.eta
            }
            fn phi(&self) -> f64 {
                self.phi
            }
            fn mass(&self) -> f64 {
                self.mass
            }
        })*
    };
}

/// A reconstructed electron.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Electron {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    /// Cut-based identification working point (0 = fail, 1 = veto, 2 = loose, 3 = medium,
    /// 4 = tight).
    pub cut_based: i32,
    /// 3D impact parameter significance with respect to the primary vertex.
    pub sip3d: f64,
}

/// A reconstructed muon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Muon {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    pub tight_id: bool,
    pub sip3d: f64,
    /// Relative particle-flow isolation in a cone of $`\Delta R = 0.4`$.
    pub pf_rel_iso04_all: f64,
}

/// A reconstructed jet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    /// Combined secondary vertex b-tag discriminant.
    pub btag_csvv2: f64,
    /// Jet identification bitmask (bit 1 = tight, bit 2 = tight with lepton veto).
    pub jet_id: i32,
}

impl Jet {
    pub fn is_tight(&self) -> bool {
        self.jet_id & 2 != 0
    }
    pub fn is_tight_lepton_veto(&self) -> bool {
        self.jet_id & 4 != 0
    }
    /// Whether the b-tag score is strictly above `threshold`.
    pub fn is_btagged(&self, threshold: f64) -> bool {
        self.btag_csvv2 > threshold
    }
}

impl_kinematics!(Electron, Muon, Jet);

/// The object collections recorded for a single collision event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub electrons: Vec<Electron>,
    pub muons: Vec<Muon>,
    pub jets: Vec<Jet>,
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Event:")?;
        writeln!(f, "  electrons:")?;
        for electron in &self.electrons {
            writeln!(f, "    {}", electron.p4())?;
        }
        writeln!(f, "  muons:")?;
        for muon in &self.muons {
            writeln!(f, "    {}", muon.p4())?;
        }
        writeln!(f, "  jets:")?;
        for jet in &self.jets {
            writeln!(f, "    {} btag = {:.3}", jet.p4(), jet.btag_csvv2)?;
        }
        Ok(())
    }
}

/// Branch suffixes read for each object kind, in the order the struct fields are filled.
const ELECTRON_FIELDS: [&str; 6] = ["pt", "eta", "phi", "mass", "cutBased", "sip3d"];
const MUON_FIELDS: [&str; 7] = [
    "pt",
    "eta",
    "phi",
    "mass",
    "tightId",
    "sip3d",
    "pfRelIso04_all",
];
const JET_FIELDS: [&str; 6] = ["pt", "eta", "phi", "mass", "btagCSVV2", "jetId"];

fn fields_for(kind: ObjectKind) -> &'static [&'static str] {
    match kind {
        ObjectKind::Electron => &ELECTRON_FIELDS,
        ObjectKind::Muon => &MUON_FIELDS,
        ObjectKind::Jet => &JET_FIELDS,
    }
}

/// An ordered batch of [`Event`]s, usually one entry range of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn n_events(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// The NanoAOD branch names needed to build [`Event`]s (`Electron_pt`, `Jet_btagCSVV2`, ...).
    pub fn required_columns() -> Vec<String> {
        [ObjectKind::Electron, ObjectKind::Muon, ObjectKind::Jet]
            .into_iter()
            .flat_map(|kind| {
                fields_for(kind)
                    .iter()
                    .map(move |field| format!("{}_{field}", kind.prefix()))
            })
            .collect()
    }

    /// Read the entries `[entry_start, entry_stop)` of `source` into a batch.
    pub fn read<S: ColumnarSource + ?Sized>(
        source: &S,
        entry_start: usize,
        entry_stop: usize,
    ) -> AgcResult<Self> {
        let names = Self::required_columns();
        let fields: Vec<&str> = names.iter().map(String::as_str).collect();
        let columns = source.read(&fields, entry_start, entry_stop)?;
        Self::from_columns(&columns)
    }

    /// Assemble events from jagged NanoAOD-style columns.
    ///
    /// Every attribute column of a collection must have the same per-event length as that
    /// collection's `pt` column.
    pub fn from_columns(columns: &IndexMap<String, Vec<Value>>) -> AgcResult<Self> {
        let electrons = collection(columns, ObjectKind::Electron, |v| Electron {
            pt: v[0],
            eta: v[1],
            phi: v[2],
            mass: v[3],
            cut_based: v[4] as i32,
            sip3d: v[5],
        })?;
        let muons = collection(columns, ObjectKind::Muon, |v| Muon {
            pt: v[0],
            eta: v[1],
            phi: v[2],
            mass: v[3],
            tight_id: v[4] == 1.0,
            sip3d: v[5],
            pf_rel_iso04_all: v[6],
        })?;
        let jets = collection(columns, ObjectKind::Jet, |v| Jet {
            pt: v[0],
            eta: v[1],
            phi: v[2],
            mass: v[3],
            btag_csvv2: v[4],
            jet_id: v[5] as i32,
        })?;
        let n_events = electrons.len();
        for (name, len) in [("Muon", muons.len()), ("Jet", jets.len())] {
            if len != n_events {
                return Err(AgcError::LengthMismatch {
                    context: format!("Number of events in collection '{name}'"),
                    expected: n_events,
                    actual: len,
                });
            }
        }
        let events = electrons
            .into_iter()
            .zip(muons)
            .zip(jets)
            .map(|((electrons, muons), jets)| Event {
                electrons,
                muons,
                jets,
            })
            .collect();
        Ok(Self { events })
    }

    /// Electrons of every event, as a jagged collection.
    pub fn electrons(&self) -> Jagged<Electron> {
        self.events.iter().map(|e| e.electrons.clone()).collect()
    }
    /// Muons of every event, as a jagged collection.
    pub fn muons(&self) -> Jagged<Muon> {
        self.events.iter().map(|e| e.muons.clone()).collect()
    }
    /// Jets of every event, as a jagged collection.
    pub fn jets(&self) -> Jagged<Jet> {
        self.events.iter().map(|e| e.jets.clone()).collect()
    }

    /// Split into consecutive batches of at most `size` events.
    pub fn partitions(&self, size: usize) -> Vec<EventBatch> {
        self.events
            .chunks(size.max(1))
            .map(|chunk| EventBatch::new(chunk.to_vec()))
            .collect()
    }
}

impl FromIterator<Event> for EventBatch {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EventBatch {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn jagged_numbers(columns: &IndexMap<String, Vec<Value>>, name: &str) -> AgcResult<Jagged<f64>> {
    let column = columns
        .get(name)
        .ok_or_else(|| AgcError::MissingColumn {
            name: name.to_string(),
        })?;
    column
        .iter()
        .enumerate()
        .map(|(entry, value)| match value {
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::Number(x) => Ok(*x),
                    Value::List(_) => Err(AgcError::Custom(format!(
                        "Column '{name}' is nested deeper than one level at entry {entry}"
                    ))),
                })
                .collect(),
            Value::Number(_) => Err(AgcError::Custom(format!(
                "Column '{name}' holds a scalar at entry {entry}; expected a per-object list"
            ))),
        })
        .collect()
}

fn collection<T, F>(
    columns: &IndexMap<String, Vec<Value>>,
    kind: ObjectKind,
    build: F,
) -> AgcResult<Jagged<T>>
where
    F: Fn(&[f64]) -> T,
{
    let fields = fields_for(kind);
    let attributes = fields
        .iter()
        .map(|field| jagged_numbers(columns, &format!("{}_{field}", kind.prefix())))
        .collect::<AgcResult<Vec<_>>>()?;
    let reference = &attributes[0];
    for (field, attribute) in fields.iter().zip(&attributes).skip(1) {
        if attribute.len() != reference.len() {
            return Err(AgcError::LengthMismatch {
                context: format!("Number of events in column '{}_{field}'", kind.prefix()),
                expected: reference.len(),
                actual: attribute.len(),
            });
        }
        for (entry, (objects, reference_objects)) in attribute.iter().zip(reference).enumerate() {
            if objects.len() != reference_objects.len() {
                return Err(AgcError::LengthMismatch {
                    context: format!(
                        "Objects in column '{}_{field}' at entry {entry}",
                        kind.prefix()
                    ),
                    expected: reference_objects.len(),
                    actual: objects.len(),
                });
            }
        }
    }
    let mut row = vec![0.0; fields.len()];
    Ok((0..reference.len())
        .map(|entry| {
            (0..reference[entry].len())
                .map(|object| {
                    for (slot, attribute) in row.iter_mut().zip(&attributes) {
                        *slot = attribute[entry][object];
                    }
                    build(&row)
                })
                .collect()
        })
        .collect())
}

/// Convert a batch back into NanoAOD-style columns, the inverse of [`EventBatch::from_columns`].
pub fn to_columns(batch: &EventBatch) -> IndexMap<String, Vec<Value>> {
    let mut columns: IndexMap<String, Vec<Value>> = EventBatch::required_columns()
        .into_iter()
        .map(|name| (name, Vec::with_capacity(batch.n_events())))
        .collect();
    fn push<T>(
        columns: &mut IndexMap<String, Vec<Value>>,
        kind: ObjectKind,
        objects: &[T],
        attributes: impl Fn(&T) -> Vec<f64>,
    ) {
        let rows: Vec<Vec<f64>> = objects.iter().map(attributes).collect();
        for (index, field) in fields_for(kind).iter().enumerate() {
            let name = format!("{}_{field}", kind.prefix());
            let values = rows.iter().map(|row| Value::Number(row[index])).collect();
            if let Some(column) = columns.get_mut(&name) {
                column.push(Value::List(values));
            }
        }
    }
    for event in batch {
        push(&mut columns, ObjectKind::Electron, &event.electrons, |e| {
            vec![e.pt, e.eta, e.phi, e.mass, e.cut_based as f64, e.sip3d]
        });
        push(&mut columns, ObjectKind::Muon, &event.muons, |m| {
            vec![
                m.pt,
                m.eta,
                m.phi,
                m.mass,
                if m.tight_id { 1.0 } else { 0.0 },
                m.sip3d,
                m.pf_rel_iso04_all,
            ]
        });
        push(&mut columns, ObjectKind::Jet, &event.jets, |j| {
            vec![j.pt, j.eta, j.phi, j.mass, j.btag_csvv2, j.jet_id as f64]
        });
    }
    columns
}

/// A single-muon event with four tight jets, two of them b-tagged, which lands in the `4j2b`
/// region under the default cuts.
pub fn test_event() -> Event {
    Event {
        electrons: vec![Electron {
            pt: 12.0,
            eta: 0.3,
            phi: 1.1,
            mass: 0.000511,
            cut_based: 4,
            sip3d: 1.0,
        }],
        muons: vec![Muon {
            pt: 41.3,
            eta: -0.8,
            phi: 2.9,
            mass: 0.10566,
            tight_id: true,
            sip3d: 1.2,
            pf_rel_iso04_all: 0.04,
        }],
        jets: vec![
            test_jet(95.2, 0.4, 0.2, 11.1, 0.91),
            test_jet(71.8, -1.1, 2.4, 9.3, 0.12),
            test_jet(55.0, 0.9, -2.0, 7.7, 0.65),
            test_jet(38.4, -0.2, -0.7, 6.2, 0.30),
        ],
    }
}

/// A tight-lepton-veto jet with the given kinematics and b-tag score.
pub fn test_jet(pt: f64, eta: f64, phi: f64, mass: f64, btag: f64) -> Jet {
    Jet {
        pt,
        eta,
        phi,
        mass,
        btag_csvv2: btag,
        jet_id: 6,
    }
}
