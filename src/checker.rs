//! Check dispatch - runs the probe sequence for a task and returns an Outcome

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::config::CheckConfig;
use crate::error::ProbeError;
use crate::models::{Category, Outcome, Task};
use crate::probes::{
    audio_video_probes, check_equal_run, check_size, extra_image_probes, image_probes, Probe,
};

/// Anything that can turn a task into an outcome.
///
/// Implementations must never panic or return early without an outcome;
/// the worker pool relies on exactly one outcome per task.
pub trait Check: Send + Sync {
    fn check(&self, task: &Task) -> Outcome;
}

/// Ordered probe lists for each category
pub struct ProbeSet {
    image: Vec<Box<dyn Probe>>,
    extra_image: Vec<Box<dyn Probe>>,
    audio_video: Vec<Box<dyn Probe>>,
}

impl ProbeSet {
    /// Probe set with no category probes (size and zero-run only)
    pub fn empty() -> Self {
        Self {
            image: Vec::new(),
            extra_image: Vec::new(),
            audio_video: Vec::new(),
        }
    }

    /// Full probe set using the configured external tools
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            image: image_probes(config),
            extra_image: extra_image_probes(config),
            audio_video: audio_video_probes(config),
        }
    }

    /// Replace the probes of one category
    pub fn with_probes(mut self, category: Category, probes: Vec<Box<dyn Probe>>) -> Self {
        match category {
            Category::Image => self.image = probes,
            Category::ExtraImage => self.extra_image = probes,
            Category::AudioVideo => self.audio_video = probes,
        }
        self
    }

    /// Probes to run for `category`, in order
    pub fn for_category(&self, category: Category) -> &[Box<dyn Probe>] {
        match category {
            Category::Image => &self.image,
            Category::ExtraImage => &self.extra_image,
            Category::AudioVideo => &self.audio_video,
        }
    }
}

/// Default [`Check`] implementation: size, zero-run, then category probes
pub struct Checker {
    probes: ProbeSet,
    zero_detect: usize,
}

impl Checker {
    /// Checker using the configured tools and zero-run threshold
    pub fn new(config: &CheckConfig) -> Self {
        Self::with_probes(ProbeSet::from_config(config), config.zero_detect)
    }

    /// Checker with a custom probe set
    pub fn with_probes(probes: ProbeSet, zero_detect: usize) -> Self {
        Self {
            probes,
            zero_detect,
        }
    }

    fn run_probes(
        &self,
        path: &Path,
        category: Option<Category>,
        size: &mut Option<u64>,
    ) -> Result<(), ProbeError> {
        *size = Some(check_size(path)?);

        if self.zero_detect > 0 {
            check_equal_run(path, self.zero_detect)?;
        }

        if let Some(category) = category {
            for probe in self.probes.for_category(category) {
                log::trace!("{} on {}", probe.name(), path.display());
                probe.verify(path)?;
            }
        }
        Ok(())
    }
}

impl Check for Checker {
    fn check(&self, task: &Task) -> Outcome {
        let mut size = None;
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.run_probes(&task.path, task.category, &mut size)
        }))
        .unwrap_or_else(|payload| Err(ProbeError::Panicked(panic_message(payload.as_ref()))));

        // the size probe bails out on empty files before recording the size
        if size.is_none() {
            size = std::fs::metadata(&task.path).ok().map(|m| m.len());
        }

        match result {
            Ok(()) => Outcome::passed(task.path.clone(), size),
            Err(e) => Outcome::failed(task.path.clone(), e.to_string(), size),
        }
    }
}

/// Text of a panic payload, for logs and outcomes
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
