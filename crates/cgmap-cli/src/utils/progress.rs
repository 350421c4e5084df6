use cgmap::core::fitting::harmonic::FitQuality;
use cgmap::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 80;

/// Renders workflow progress on stderr: a spinner while a phase starts up,
/// a bar while its tasks run, and a line for every interaction that did not
/// get a clean windowed fit.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: ProgressBar,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.finish_and_clear();
        Self { bar }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();
        Box::new(move |progress: Progress| render(&bar, progress))
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn render(bar: &ProgressBar, progress: Progress) {
    match progress {
        Progress::PhaseStart { name } => {
            bar.reset();
            bar.set_length(0);
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            bar.set_message(name);
        }
        Progress::PhaseFinish => {
            bar.disable_steady_tick();
            bar.finish_with_message("✓ Done");
        }
        Progress::TaskStart { total_steps } => {
            bar.disable_steady_tick();
            bar.reset();
            bar.set_length(total_steps);
            bar.set_style(bar_style());
        }
        Progress::TaskIncrement => bar.inc(1),
        Progress::TaskFinish => {
            if let Some(length) = bar.length() {
                bar.set_position(length);
            }
            bar.finish();
        }
        Progress::InteractionFitted { label, quality } => {
            if let Some(note) = fit_note(&label, quality) {
                bar.println(note);
            }
            bar.set_message(label);
        }
        Progress::Summary {
            fitted,
            fallbacks,
            missing,
        } => bar.println(summary_line(fitted, fallbacks, missing)),
    }
}

/// Line printed above the bar for a fit worth a second look.
fn fit_note(label: &str, quality: Option<FitQuality>) -> Option<String> {
    match quality {
        Some(FitQuality::Converged) => None,
        Some(quality) => Some(format!("  {label}: {quality}")),
        None => Some(format!("  {label}: no samples")),
    }
}

fn summary_line(fitted: usize, fallbacks: usize, missing: usize) -> String {
    let mut line = format!("  {fitted} fitted");
    if fallbacks > 0 {
        line.push_str(&format!(", {fallbacks} from a fallback fit"));
    }
    if missing > 0 {
        line.push_str(&format!(", {missing} without samples"));
    }
    line
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("##-")
}
