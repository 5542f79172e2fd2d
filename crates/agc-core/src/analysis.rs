use std::{
    fmt::Display,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
};

use auto_ops::impl_op_ex;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_pickle::{DeOptions, SerOptions};
use tracing::{debug, info};

use crate::{
    data::EventBatch,
    reconstruction::{reconstruct_trijet_mass_with_threshold, scalar_ht},
    selection::{apply_mask, object_selection, region_selections, ObjectCuts},
    source::ColumnarSource,
    utils::{enums::Region, Histogram},
    AgcResult, B_TAG_THRESHOLD,
};

/// Integrated luminosity of the reference dataset in $`\text{pb}^{-1}`$.
pub const LUMINOSITY: f64 = 3378.0;

/// Settings for [`create_histograms`] and [`process_samples`].
///
/// Both regions share one regular binning; by default 25 bins over $`[50, 550)`$ GeV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub cuts: ObjectCuts,
    pub btag_threshold: f64,
    pub luminosity: f64,
    pub bins: usize,
    pub range: (f64, f64),
    /// Maximum number of events read and processed at once.
    pub partition_size: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            cuts: ObjectCuts::default(),
            btag_threshold: B_TAG_THRESHOLD,
            luminosity: LUMINOSITY,
            bins: 25,
            range: (50.0, 550.0),
            partition_size: 250_000,
        }
    }
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cuts(mut self, cuts: ObjectCuts) -> Self {
        self.cuts = cuts;
        self
    }

    pub fn btag_threshold(mut self, threshold: f64) -> Self {
        self.btag_threshold = threshold;
        self
    }

    pub fn luminosity(mut self, luminosity: f64) -> Self {
        self.luminosity = luminosity;
        self
    }

    pub fn binning(mut self, bins: usize, range: (f64, f64)) -> Self {
        self.bins = bins;
        self.range = range;
        self
    }

    pub fn partition_size(mut self, partition_size: usize) -> Self {
        self.partition_size = partition_size.max(1);
        self
    }
}

/// Bookkeeping attached to each sample of a fileset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Short process name; `"data"` marks collision data.
    pub process: String,
    /// Systematic variation, usually `"nominal"`.
    pub variation: String,
    /// Label under which the sample is histogrammed.
    pub process_label: String,
    /// Cross-section in pb.
    pub xsec: f64,
    /// Total number of generated events.
    pub nevts: u64,
}

impl SampleMetadata {
    pub fn new<S: Into<String>>(process: S, variation: S) -> Self {
        let process = process.into();
        Self {
            process_label: process.clone(),
            process,
            variation: variation.into(),
            xsec: 1.0,
            nevts: 1,
        }
    }

    pub fn data() -> Self {
        Self::new("data", "nominal")
    }

    pub fn process_label<S: Into<String>>(mut self, label: S) -> Self {
        self.process_label = label.into();
        self
    }

    pub fn xsec(mut self, xsec: f64) -> Self {
        self.xsec = xsec;
        self
    }

    pub fn nevts(mut self, nevts: u64) -> Self {
        self.nevts = nevts;
        self
    }

    pub fn is_data(&self) -> bool {
        self.process == "data"
    }

    /// The per-event weight $`\sigma L / N`$ for simulation, or one for data.
    pub fn weight(&self, luminosity: f64) -> f64 {
        if self.is_data() {
            1.0
        } else {
            self.xsec * luminosity / self.nevts.max(1) as f64
        }
    }
}

impl Display for SampleMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}__{}", self.process, self.variation)
    }
}

/// One histogram of a [`HistogramSet`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub region: Region,
    pub process: String,
    pub variation: String,
    pub histogram: Histogram,
}

/// Histograms of the analysis observables keyed by region, process and variation.
///
/// Sets with the same binning combine with `+`, which adds histograms with equal keys and keeps
/// the rest. `4j1b` holds $`H_T`$ and `4j2b` holds $`m_{bjj}`$.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramSet {
    pub bins: usize,
    pub range: (f64, f64),
    pub entries: Vec<HistogramEntry>,
}

impl HistogramSet {
    pub fn new(bins: usize, range: (f64, f64)) -> Self {
        Self {
            bins,
            range,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, region: Region, process: &str, variation: &str) -> Option<&Histogram> {
        self.position(region, process, variation)
            .map(|index| &self.entries[index].histogram)
    }

    fn position(&self, region: Region, process: &str, variation: &str) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry.region == region && entry.process == process && entry.variation == variation
        })
    }

    /// The histogram for a key, created empty if it does not exist yet.
    pub fn entry(&mut self, region: Region, process: &str, variation: &str) -> &mut Histogram {
        let index = match self.position(region, process, variation) {
            Some(index) => index,
            None => {
                self.entries.push(HistogramEntry {
                    region,
                    process: process.to_string(),
                    variation: variation.to_string(),
                    histogram: Histogram::new(self.bins, self.range),
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].histogram
    }

    pub fn fill(
        &mut self,
        region: Region,
        process: &str,
        variation: &str,
        values: &[f64],
        weight: f64,
    ) {
        self.entry(region, process, variation).fill(values, weight);
    }

    pub fn processes(&self) -> Vec<&str> {
        let mut processes: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !processes.contains(&entry.process.as_str()) {
                processes.push(&entry.process);
            }
        }
        processes
    }

    /// The sum over all processes of one region and variation.
    pub fn stack(&self, region: Region, variation: &str) -> Option<Histogram> {
        self.entries
            .iter()
            .filter(|entry| entry.region == region && entry.variation == variation)
            .map(|entry| entry.histogram.clone())
            .reduce(|a, b| a + b)
    }

    /// Write the set as a Python pickle.
    pub fn save(&self, file_path: &str) -> AgcResult<()> {
        let path = PathBuf::from(&*shellexpand::full(file_path)?);
        let mut writer = BufWriter::new(File::create(path)?);
        serde_pickle::to_writer(&mut writer, self, SerOptions::new())?;
        writer.flush()?;
        Ok(())
    }

    /// Read a set written by [`HistogramSet::save`].
    pub fn load(file_path: &str) -> AgcResult<Self> {
        let path = PathBuf::from(&*shellexpand::full(file_path)?);
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_pickle::from_reader(reader, DeOptions::new())?)
    }

    fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for entry in &other.entries {
            let target = merged.entry(entry.region, &entry.process, &entry.variation);
            *target = &*target + &entry.histogram;
        }
        merged
    }
}

impl_op_ex!(+ |a: &HistogramSet, b: &HistogramSet| -> HistogramSet { a.merge(b) });

impl Display for HistogramSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{:>4} {:<20} {:<16} total = {:.3} (underflow {:.3}, overflow {:.3})",
                entry.region,
                entry.process,
                entry.variation,
                entry.histogram.total(),
                entry.histogram.underflow,
                entry.histogram.overflow
            )?;
        }
        Ok(())
    }
}

/// Fill $`H_T`$ of `4j1b` events and $`m_{bjj}`$ of `4j2b` events of one batch, weighted by the
/// sample normalization.
pub fn create_histograms(
    batch: &EventBatch,
    metadata: &SampleMetadata,
    options: &AnalysisOptions,
) -> AgcResult<HistogramSet> {
    let weight = metadata.weight(options.luminosity);
    let (electrons, muons, jets) = object_selection(batch, &options.cuts);
    let selections = region_selections(&electrons, &muons, &jets, options.btag_threshold)?;

    let jets_4j1b = apply_mask(&jets, &selections.all(&["4j1b"])?)?;
    let jets_4j2b = apply_mask(&jets, &selections.all(&["4j2b"])?)?;
    let ht = scalar_ht(&jets_4j1b);
    let m_bjj = reconstruct_trijet_mass_with_threshold(&jets_4j2b, options.btag_threshold);
    debug!(
        sample = %metadata,
        events = batch.n_events(),
        n_4j1b = jets_4j1b.len(),
        n_4j2b = jets_4j2b.len(),
        "filled region histograms"
    );

    let mut histograms = HistogramSet::new(options.bins, options.range);
    let (process, variation) = (&metadata.process_label, &metadata.variation);
    histograms.fill(Region::FourJetsOneTag, process, variation, &ht, weight);
    histograms.fill(Region::FourJetsTwoTags, process, variation, &m_bjj, weight);
    Ok(histograms)
}

/// Run [`create_histograms`] over every partition of `source`.
///
/// With the `rayon` feature partitions are processed in parallel; the partial sets are summed in
/// partition order.
pub fn process_source<S: ColumnarSource + ?Sized>(
    source: &S,
    metadata: &SampleMetadata,
    options: &AnalysisOptions,
) -> AgcResult<HistogramSet> {
    let n_entries = source.num_entries();
    let partition_size = options.partition_size.max(1);
    let starts: Vec<usize> = (0..n_entries).step_by(partition_size).collect();
    info!(
        sample = %metadata,
        entries = n_entries,
        partitions = starts.len(),
        weight = metadata.weight(options.luminosity),
        "processing sample"
    );
    let process_partition = |&start: &usize| {
        let stop = (start + partition_size).min(n_entries);
        let batch = EventBatch::read(source, start, stop)?;
        create_histograms(&batch, metadata, options)
    };
    #[cfg(feature = "rayon")]
    let partials = starts
        .par_iter()
        .map(process_partition)
        .collect::<AgcResult<Vec<HistogramSet>>>()?;
    #[cfg(not(feature = "rayon"))]
    let partials = starts
        .iter()
        .map(process_partition)
        .collect::<AgcResult<Vec<HistogramSet>>>()?;
    let mut histograms = HistogramSet::new(options.bins, options.range);
    // keep both regions present even when the source is empty
    for region in Region::ALL {
        histograms.entry(region, &metadata.process_label, &metadata.variation);
    }
    Ok(partials
        .iter()
        .fold(histograms, |total, partial| total + partial))
}

/// A sample of a fileset: its bookkeeping and where its events are stored.
pub struct Sample {
    pub metadata: SampleMetadata,
    pub source: Box<dyn ColumnarSource>,
}

impl Sample {
    pub fn new<S: ColumnarSource + 'static>(metadata: SampleMetadata, source: S) -> Self {
        Self {
            metadata,
            source: Box::new(source),
        }
    }
}

/// Process every sample and stack the results into one [`HistogramSet`].
pub fn process_samples(samples: &[Sample], options: &AnalysisOptions) -> AgcResult<HistogramSet> {
    let mut histograms = HistogramSet::new(options.bins, options.range);
    for sample in samples {
        let partial = process_source(sample.source.as_ref(), &sample.metadata, options)?;
        histograms = histograms + partial;
    }
    Ok(histograms)
}
