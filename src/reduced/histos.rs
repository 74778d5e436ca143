use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    histograms::{Axis, Histogram, Histogram1D, Histogram2D, OutputList},
    reduced::vars::{VarArray, Variable},
    EvTaskError, EvTaskResult,
};

/// A histogram together with the scratch variables it is filled from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BoundHistogram {
    H1 {
        histogram: Histogram1D,
        x: Variable,
    },
    H2 {
        histogram: Histogram2D,
        x: Variable,
        y: Variable,
    },
}

impl BoundHistogram {
    pub fn name(&self) -> &str {
        match self {
            BoundHistogram::H1 { histogram, .. } => histogram.name(),
            BoundHistogram::H2 { histogram, .. } => histogram.name(),
        }
    }
    fn fill(&mut self, values: &VarArray) {
        match self {
            BoundHistogram::H1 { histogram, x } => {
                histogram.fill(values[*x]);
            }
            BoundHistogram::H2 { histogram, x, y } => {
                histogram.fill(values[*x], values[*y]);
            }
        }
    }
}

/// Named groups ("classes") of histograms filled together from a [`VarArray`].
///
/// A task typically books one class per selection stage (say `Event_BeforeCuts` and
/// `Event_AfterCuts`) and fills a class with whatever is currently in its scratch array.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistogramManager {
    name: String,
    classes: IndexMap<String, Vec<BoundHistogram>>,
}

impl HistogramManager {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            classes: IndexMap::new(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(|k| k.as_str())
    }
    /// Register an empty histogram class.
    pub fn add_histogram_class(&mut self, class: &str) -> EvTaskResult<()> {
        if self.classes.contains_key(class) {
            return Err(EvTaskError::DuplicateHistogram {
                name: class.to_string(),
            });
        }
        debug!(manager = %self.name, class, "booked histogram class");
        self.classes.insert(class.to_string(), Vec::new());
        Ok(())
    }
    fn class_mut(&mut self, class: &str) -> EvTaskResult<&mut Vec<BoundHistogram>> {
        self.classes
            .get_mut(class)
            .ok_or_else(|| EvTaskError::HistogramNotFound {
                name: class.to_string(),
            })
    }
    fn insert(&mut self, class: &str, histogram: BoundHistogram) -> EvTaskResult<()> {
        let members = self.class_mut(class)?;
        if members.iter().any(|h| h.name() == histogram.name()) {
            return Err(EvTaskError::DuplicateHistogram {
                name: format!("{}/{}", class, histogram.name()),
            });
        }
        members.push(histogram);
        Ok(())
    }
    /// Book a one-dimensional histogram of `x` in `class`. An empty title is replaced by
    /// `"{x} ({unit})"`.
    pub fn add_histogram_1d(
        &mut self,
        class: &str,
        name: &str,
        title: &str,
        x: Variable,
        axis: Axis,
    ) -> EvTaskResult<()> {
        let title = if title.is_empty() {
            axis_title(x)
        } else {
            title.to_string()
        };
        self.insert(
            class,
            BoundHistogram::H1 {
                histogram: Histogram1D::new(name, title, axis),
                x,
            },
        )
    }
    /// Book a two-dimensional histogram of `y` against `x` in `class`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_histogram_2d(
        &mut self,
        class: &str,
        name: &str,
        title: &str,
        x: Variable,
        x_axis: Axis,
        y: Variable,
        y_axis: Axis,
    ) -> EvTaskResult<()> {
        let title = if title.is_empty() {
            format!("{};{}", axis_title(x), axis_title(y))
        } else {
            title.to_string()
        };
        self.insert(
            class,
            BoundHistogram::H2 {
                histogram: Histogram2D::new(name, title, x_axis, y_axis),
                x,
                y,
            },
        )
    }
    /// Fill every histogram of `class` from `values`.
    pub fn fill_histogram_class(&mut self, class: &str, values: &VarArray) -> EvTaskResult<()> {
        self.class_mut(class)?
            .iter_mut()
            .for_each(|h| h.fill(values));
        Ok(())
    }
    fn find(&self, class: &str, name: &str) -> Option<&BoundHistogram> {
        self.classes
            .get(class)
            .and_then(|members| members.iter().find(|h| h.name() == name))
    }
    pub fn h1(&self, class: &str, name: &str) -> EvTaskResult<&Histogram1D> {
        match self.find(class, name) {
            Some(BoundHistogram::H1 { histogram, .. }) => Ok(histogram),
            _ => Err(EvTaskError::HistogramNotFound {
                name: format!("{}/{}", class, name),
            }),
        }
    }
    pub fn h2(&self, class: &str, name: &str) -> EvTaskResult<&Histogram2D> {
        match self.find(class, name) {
            Some(BoundHistogram::H2 { histogram, .. }) => Ok(histogram),
            _ => Err(EvTaskError::HistogramNotFound {
                name: format!("{}/{}", class, name),
            }),
        }
    }
    /// Zero every booked histogram.
    pub fn reset(&mut self) {
        for histogram in self.classes.values_mut().flatten() {
            match histogram {
                BoundHistogram::H1 { histogram, .. } => histogram.reset(),
                BoundHistogram::H2 { histogram, .. } => histogram.reset(),
            }
        }
    }
    /// Copy every histogram into an [`OutputList`] named after the manager, with entries named
    /// `"{class}/{histogram}"`.
    pub fn output_list(&self) -> EvTaskResult<OutputList> {
        let mut list = OutputList::new(self.name.clone());
        for (class, members) in &self.classes {
            for member in members {
                let qualified = format!("{}/{}", class, member.name());
                let renamed: Histogram = match member {
                    BoundHistogram::H1 { histogram, .. } => {
                        histogram.clone().with_name(qualified).into()
                    }
                    BoundHistogram::H2 { histogram, .. } => {
                        histogram.clone().with_name(qualified).into()
                    }
                };
                list.add(renamed)?;
            }
        }
        Ok(list)
    }
}

fn axis_title(variable: Variable) -> String {
    match variable.unit() {
        "" => variable.name().to_string(),
        unit => format!("{} ({})", variable.name(), unit),
    }
}
