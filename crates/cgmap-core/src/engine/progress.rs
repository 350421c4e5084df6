use crate::core::fitting::harmonic::FitQuality;

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// One interaction type has been processed; `quality` is `None` when it
    /// does not occur in the topology.
    InteractionFitted {
        label: String,
        quality: Option<FitQuality>,
    },

    /// End-of-fitting tally; `fallbacks` counts fits that are not [`FitQuality::Converged`].
    Summary {
        fitted: usize,
        fallbacks: usize,
        missing: usize,
    },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
