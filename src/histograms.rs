use accurate::{sum::Klein, traits::*};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    utils::{get_bin_edges, get_bin_index},
    EvTaskError, EvTaskResult,
};

/// A fixed-width binning along one axis.
///
/// Bins are numbered from 1 to [`Axis::n_bins`]; bin 0 collects underflow and bin
/// `n_bins + 1` collects overflow.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisBounds")]
pub struct Axis {
    n_bins: usize,
    min: f64,
    max: f64,
}

// The unchecked wire form of an `Axis`.
#[derive(Deserialize)]
struct AxisBounds {
    n_bins: usize,
    min: f64,
    max: f64,
}

impl TryFrom<AxisBounds> for Axis {
    type Error = EvTaskError;

    fn try_from(bounds: AxisBounds) -> EvTaskResult<Self> {
        Self::try_new(bounds.n_bins, bounds.min, bounds.max)
    }
}

impl Axis {
    /// Create an axis with `n_bins` equal bins spanning `[min, max)`.
    ///
    /// # Panics
    ///
    /// Panics if `n_bins` is zero or the range is empty or not finite.
    pub fn new(n_bins: usize, min: f64, max: f64) -> Self {
        assert!(n_bins > 0, "Number of bins must be greater than zero!");
        assert!(
            max > min,
            "The lower edge of the range must be smaller than the upper edge!"
        );
        assert!(
            min.is_finite() && max.is_finite(),
            "The range of an axis must be finite!"
        );
        Self { n_bins, min, max }
    }
    /// Fallible version of [`Axis::new`].
    ///
    /// # Errors
    ///
    /// Returns [`EvTaskError::InvalidAxis`] if `n_bins` is zero or the range is empty or not
    /// finite.
    pub fn try_new(n_bins: usize, min: f64, max: f64) -> EvTaskResult<Self> {
        let valid = n_bins > 0 && max > min && min.is_finite() && max.is_finite();
        if !valid {
            return Err(EvTaskError::InvalidAxis { n_bins, min, max });
        }
        Ok(Self { n_bins, min, max })
    }
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }
    pub fn min(&self) -> f64 {
        self.min
    }
    pub fn max(&self) -> f64 {
        self.max
    }
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.n_bins as f64
    }
    /// The bin edges, one more than the number of bins.
    pub fn edges(&self) -> Vec<f64> {
        get_bin_edges(self.n_bins, (self.min, self.max))
    }
    /// Whether `value` lies inside `[min, max)`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }
    /// The 1-based bin holding `value`, `0` for underflow and `n_bins + 1` for overflow (NaN is
    /// treated as overflow).
    pub fn find_bin(&self, value: f64) -> usize {
        match get_bin_index(value, self.n_bins, (self.min, self.max)) {
            Some(index) => index + 1,
            None if value < self.min => 0,
            None => self.n_bins + 1,
        }
    }
    /// The centre of the 1-based `bin`.
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 - 0.5) * self.bin_width()
    }
}

/// A one-dimensional histogram with weighted fills.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Histogram1D {
    name: String,
    title: String,
    axis: Axis,
    contents: Vec<f64>,
    entries: u64,
}

impl Histogram1D {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, title: T, axis: Axis) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            contents: vec![0.0; axis.n_bins() + 2],
            axis,
            entries: 0,
        }
    }
    /// The same histogram under a different name.
    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn axis(&self) -> &Axis {
        &self.axis
    }
    /// Number of fill calls, including under- and overflow.
    pub fn entries(&self) -> u64 {
        self.entries
    }
    /// Fill `value` with unit weight, returning the bin it landed in.
    pub fn fill(&mut self, value: f64) -> usize {
        self.fill_weighted(value, 1.0)
    }
    /// Fill `value` with the given `weight`, returning the bin it landed in.
    pub fn fill_weighted(&mut self, value: f64, weight: f64) -> usize {
        let bin = self.axis.find_bin(value);
        self.contents[bin] += weight;
        self.entries += 1;
        bin
    }
    /// Content of a bin (0 and `n_bins + 1` are under- and overflow).
    pub fn bin_content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or(0.0)
    }
    pub fn underflow(&self) -> f64 {
        self.contents[0]
    }
    pub fn overflow(&self) -> f64 {
        self.contents[self.axis.n_bins() + 1]
    }
    /// Sum of the in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.contents[1..=self.axis.n_bins()]
            .iter()
            .copied()
            .sum_with_accumulator::<Klein<f64>>()
    }
    /// Weighted mean of the in-range bin centres.
    pub fn mean(&self) -> f64 {
        let integral = self.integral();
        if integral == 0.0 {
            return 0.0;
        }
        (1..=self.axis.n_bins())
            .map(|bin| self.axis.bin_center(bin) * self.contents[bin])
            .sum_with_accumulator::<Klein<f64>>()
            / integral
    }
    pub fn reset(&mut self) {
        self.contents.iter_mut().for_each(|c| *c = 0.0);
        self.entries = 0;
    }
}

/// A two-dimensional histogram with weighted fills.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Histogram2D {
    name: String,
    title: String,
    x_axis: Axis,
    y_axis: Axis,
    contents: Vec<f64>,
    entries: u64,
}

impl Histogram2D {
    pub fn new<N: Into<String>, T: Into<String>>(
        name: N,
        title: T,
        x_axis: Axis,
        y_axis: Axis,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            contents: vec![0.0; (x_axis.n_bins() + 2) * (y_axis.n_bins() + 2)],
            x_axis,
            y_axis,
            entries: 0,
        }
    }
    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }
    pub fn entries(&self) -> u64 {
        self.entries
    }
    fn global_bin(&self, x_bin: usize, y_bin: usize) -> usize {
        y_bin * (self.x_axis.n_bins() + 2) + x_bin
    }
    /// Fill `(x, y)` with unit weight, returning the `(x, y)` bins it landed in.
    pub fn fill(&mut self, x: f64, y: f64) -> (usize, usize) {
        self.fill_weighted(x, y, 1.0)
    }
    pub fn fill_weighted(&mut self, x: f64, y: f64, weight: f64) -> (usize, usize) {
        let x_bin = self.x_axis.find_bin(x);
        let y_bin = self.y_axis.find_bin(y);
        let global = self.global_bin(x_bin, y_bin);
        self.contents[global] += weight;
        self.entries += 1;
        (x_bin, y_bin)
    }
    pub fn bin_content(&self, x_bin: usize, y_bin: usize) -> f64 {
        if x_bin > self.x_axis.n_bins() + 1 || y_bin > self.y_axis.n_bins() + 1 {
            return 0.0;
        }
        self.contents[self.global_bin(x_bin, y_bin)]
    }
    /// Sum of the contents of all bins inside both axis ranges.
    pub fn integral(&self) -> f64 {
        (1..=self.y_axis.n_bins())
            .flat_map(|y_bin| (1..=self.x_axis.n_bins()).map(move |x_bin| (x_bin, y_bin)))
            .map(|(x_bin, y_bin)| self.contents[self.global_bin(x_bin, y_bin)])
            .sum_with_accumulator::<Klein<f64>>()
    }
    pub fn reset(&mut self) {
        self.contents.iter_mut().for_each(|c| *c = 0.0);
        self.entries = 0;
    }
}

/// Either dimensionality of histogram held by an [`OutputList`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Histogram {
    H1(Histogram1D),
    H2(Histogram2D),
}

impl Histogram {
    pub fn name(&self) -> &str {
        match self {
            Histogram::H1(h) => h.name(),
            Histogram::H2(h) => h.name(),
        }
    }
    pub fn entries(&self) -> u64 {
        match self {
            Histogram::H1(h) => h.entries(),
            Histogram::H2(h) => h.entries(),
        }
    }
}

impl From<Histogram1D> for Histogram {
    fn from(value: Histogram1D) -> Self {
        Histogram::H1(value)
    }
}

impl From<Histogram2D> for Histogram {
    fn from(value: Histogram2D) -> Self {
        Histogram::H2(value)
    }
}

/// An ordered, name-indexed collection of histograms handed back to the host after processing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputList {
    name: String,
    histograms: IndexMap<String, Histogram>,
}

impl OutputList {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            histograms: IndexMap::new(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn len(&self) -> usize {
        self.histograms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
    /// Add a histogram, keyed by its name. Names must be unique within a list.
    pub fn add<H: Into<Histogram>>(&mut self, histogram: H) -> EvTaskResult<()> {
        let histogram = histogram.into();
        let name = histogram.name().to_string();
        if self.histograms.contains_key(&name) {
            return Err(EvTaskError::DuplicateHistogram { name });
        }
        self.histograms.insert(name, histogram);
        Ok(())
    }
    pub fn contains(&self, name: &str) -> bool {
        self.histograms.contains_key(name)
    }
    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }
    pub fn h1(&self, name: &str) -> EvTaskResult<&Histogram1D> {
        match self.histograms.get(name) {
            Some(Histogram::H1(h)) => Ok(h),
            _ => Err(EvTaskError::HistogramNotFound {
                name: name.to_string(),
            }),
        }
    }
    pub fn h1_mut(&mut self, name: &str) -> EvTaskResult<&mut Histogram1D> {
        match self.histograms.get_mut(name) {
            Some(Histogram::H1(h)) => Ok(h),
            _ => Err(EvTaskError::HistogramNotFound {
                name: name.to_string(),
            }),
        }
    }
    pub fn h2(&self, name: &str) -> EvTaskResult<&Histogram2D> {
        match self.histograms.get(name) {
            Some(Histogram::H2(h)) => Ok(h),
            _ => Err(EvTaskError::HistogramNotFound {
                name: name.to_string(),
            }),
        }
    }
    pub fn h2_mut(&mut self, name: &str) -> EvTaskResult<&mut Histogram2D> {
        match self.histograms.get_mut(name) {
            Some(Histogram::H2(h)) => Ok(h),
            _ => Err(EvTaskError::HistogramNotFound {
                name: name.to_string(),
            }),
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Histogram)> {
        self.histograms.iter().map(|(k, v)| (k.as_str(), v))
    }
    /// Append every histogram of `other`, failing on the first name clash.
    pub fn extend(&mut self, other: OutputList) -> EvTaskResult<()> {
        for (_, histogram) in other.histograms {
            self.add(histogram)?;
        }
        Ok(())
    }
    /// Encode this list (and every histogram in it) into a byte buffer.
    pub fn to_bytes(&self) -> EvTaskResult<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(
            self,
            bincode::config::standard(),
        )?)
    }
    /// Decode a list previously written by [`OutputList::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> EvTaskResult<Self> {
        let (list, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(list)
    }
}
