//! Classification of build and pull output lines

use crate::size::parse_size;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static BUILD_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Step\s+(\d+)/(\d+)\s*:").expect("build step regex is valid"));

static LAYER_PROGRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\S+):\s+(Pulling|Downloading)\s+\[[^\]]*\]\s+(\d+(?:\.\d+)?\s*[A-Za-z]*)/(\d+(?:\.\d+)?\s*[A-Za-z]*)",
    )
    .expect("layer progress regex is valid")
});

static BUILD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(--->|#\d+\s)").expect("build marker regex is valid"));

/// Build progress of one command invocation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuildProgressState {
    pub current_step: u32,
    pub total_steps: u32,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerAction {
    Pulling,
    Downloading,
}

impl fmt::Display for LayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerAction::Pulling => write!(f, "Pulling"),
            LayerAction::Downloading => write!(f, "Downloading"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// Classic builder `Step X/Y:` line
    BuildStep {
        current: u32,
        total: u32,
        percent: f64,
        line: String,
    },
    /// Image layer pull/download progress
    LayerProgress {
        layer: String,
        action: LayerAction,
        current_bytes: f64,
        total_bytes: f64,
        percent: f64,
    },
    /// Builder detail (`---> ...` or BuildKit `#12 ...`)
    BuildOutput(String),
    Text(String),
}

/// `current / total` as a percentage in [0, 100]; zero when total is zero
pub fn percent_of(current: f64, total: f64) -> f64 {
    if total <= 0.0 || !current.is_finite() || !total.is_finite() {
        return 0.0;
    }
    (current / total * 100.0).clamp(0.0, 100.0)
}

/// Classify one stdout line, updating `state` when the line reports build steps.
///
/// Blank lines produce no event.
pub fn classify_line(line: &str, state: &mut BuildProgressState) -> Option<OutputEvent> {
    if line.trim().is_empty() {
        return None;
    }

    if let Some(caps) = BUILD_STEP.captures(line) {
        if let (Ok(current), Ok(total)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            state.current_step = current;
            state.total_steps = total;
            state.percent = percent_of(current as f64, total as f64);
            return Some(OutputEvent::BuildStep {
                current,
                total,
                percent: state.percent,
                line: line.trim().to_string(),
            });
        }
    }

    if let Some(caps) = LAYER_PROGRESS.captures(line) {
        let action = if &caps[2] == "Pulling" {
            LayerAction::Pulling
        } else {
            LayerAction::Downloading
        };
        let current_bytes = parse_size(&caps[3]);
        let total_bytes = parse_size(&caps[4]);
        return Some(OutputEvent::LayerProgress {
            layer: caps[1].to_string(),
            action,
            current_bytes,
            total_bytes,
            percent: percent_of(current_bytes, total_bytes),
        });
    }

    if BUILD_MARKER.is_match(line) {
        return Some(OutputEvent::BuildOutput(line.trim_end().to_string()));
    }

    Some(OutputEvent::Text(line.trim_end().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_step_updates_state() {
        let mut state = BuildProgressState::default();
        let event = classify_line("Step 3/4 : RUN npm ci", &mut state);

        assert_eq!(
            event,
            Some(OutputEvent::BuildStep {
                current: 3,
                total: 4,
                percent: 75.0,
                line: "Step 3/4 : RUN npm ci".to_string(),
            })
        );
        assert_eq!(state.current_step, 3);
        assert_eq!(state.total_steps, 4);
        assert_eq!(state.percent, 75.0);
    }

    #[test]
    fn test_build_step_percent_is_clamped() {
        let mut state = BuildProgressState::default();
        classify_line("Step 9/4: odd", &mut state);
        assert_eq!(state.percent, 100.0);

        classify_line("Step 1/0: odd", &mut state);
        assert_eq!(state.percent, 0.0);
    }

    #[test]
    fn test_layer_progress() {
        let mut state = BuildProgressState::default();
        let event = classify_line(
            "a1b2c3d4: Downloading [=====>      ] 10.5MB/100.0MB",
            &mut state,
        );

        match event {
            Some(OutputEvent::LayerProgress {
                layer,
                action,
                current_bytes,
                total_bytes,
                percent,
            }) => {
                assert_eq!(layer, "a1b2c3d4");
                assert_eq!(action, LayerAction::Downloading);
                assert_eq!(current_bytes, 10.5 * 1024.0 * 1024.0);
                assert_eq!(total_bytes, 100.0 * 1024.0 * 1024.0);
                assert!((percent - 10.5).abs() < 1e-9);
            }
            other => panic!("expected layer progress, got {:?}", other),
        }
        // layer lines never touch build step state
        assert_eq!(state, BuildProgressState::default());
    }

    #[test]
    fn test_build_markers_pass_through() {
        let mut state = BuildProgressState::default();
        assert_eq!(
            classify_line(" ---> Using cache", &mut state),
            Some(OutputEvent::BuildOutput(" ---> Using cache".to_string()))
        );
        assert_eq!(
            classify_line("#7 [web 2/5] COPY . .", &mut state),
            Some(OutputEvent::BuildOutput("#7 [web 2/5] COPY . .".to_string()))
        );
    }

    #[test]
    fn test_text_and_blank_lines() {
        let mut state = BuildProgressState::default();
        assert_eq!(
            classify_line("Container shop-web-1  Started", &mut state),
            Some(OutputEvent::Text("Container shop-web-1  Started".to_string()))
        );
        assert_eq!(classify_line("", &mut state), None);
        assert_eq!(classify_line("   \t", &mut state), None);
    }
}
