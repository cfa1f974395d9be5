//! Parsing of encoder status output into progress updates.
//!
//! ffmpeg reports in two places: free-form diagnostics on stderr
//! (`Duration: 00:01:30.00`, `... time=00:00:45.00 ...`) and, when
//! `-progress pipe:1` is passed, `key=value` records on stdout. Both
//! feed the same [`ProgressState`].

/// A structured event recognized in a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEvent {
    /// Total input duration announcement, in seconds.
    Duration(f64),

    /// Media time processed so far, in seconds.
    TimeUpdate(f64),
}

/// Parse one diagnostic line. Lines without a recognizable marker yield
/// `None` and are never an error.
pub fn parse_status_line(line: &str) -> Option<StatusEvent> {
    if let Some((_, rest)) = line.split_once("Duration:") {
        let token = rest.trim_start().split([',', ' ']).next()?;
        if let Some(secs) = parse_timestamp(token) {
            return Some(StatusEvent::Duration(secs));
        }
    }

    if let Some((_, rest)) = line.split_once("time=") {
        let token = rest.split_whitespace().next()?;
        if let Some(secs) = parse_timestamp(token) {
            return Some(StatusEvent::TimeUpdate(secs));
        }
    }

    None
}

/// Parse `HH:MM:SS[.fraction]` into seconds.
fn parse_timestamp(token: &str) -> Option<f64> {
    let mut parts = token.split(':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if !(hours >= 0.0 && minutes >= 0.0 && seconds >= 0.0) {
        return None;
    }
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    total.is_finite().then_some(total)
}

/// Incremental progress for one encoder run. Reset per invocation and
/// dropped when the process terminates.
#[derive(Debug, Default)]
pub struct ProgressState {
    total_secs: Option<f64>,
    out_time_secs: f64,
    last_percent: f64,
    complete: bool,
}

impl ProgressState {
    /// Fold a parsed diagnostic event into the state. Only the first
    /// duration announcement is honored.
    pub fn apply(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::Duration(secs) => {
                if self.total_secs.is_none() && secs > 0.0 {
                    self.total_secs = Some(secs);
                }
            }
            StatusEvent::TimeUpdate(secs) => {
                self.out_time_secs = secs;
            }
        }
    }

    /// Fold one `key=value` record from the machine progress stream.
    pub fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg's out_time_ms is actually microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    /// Current percent complete, once the total duration is known.
    /// Reported values never decrease within one invocation.
    pub fn percent(&mut self) -> Option<f64> {
        let total = self.total_secs?;
        if total <= 0.0 {
            return None;
        }
        let raw = (self.out_time_secs / total * 100.0).clamp(0.0, 100.0);
        if raw > self.last_percent {
            self.last_percent = raw;
        }
        Some(self.last_percent)
    }

    pub fn total_secs(&self) -> Option<f64> {
        self.total_secs
    }

    pub fn out_time_secs(&self) -> f64 {
        self.out_time_secs
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_line() {
        let line = "  Duration: 00:01:30.00, start: 0.000000, bitrate: 1410 kb/s";
        assert_eq!(parse_status_line(line), Some(StatusEvent::Duration(90.0)));
    }

    #[test]
    fn test_parse_time_marker() {
        let line = "frame=  100 fps=25 q=28.0 size=512kB time=00:00:45.00 bitrate=93.1kbits/s";
        assert_eq!(parse_status_line(line), Some(StatusEvent::TimeUpdate(45.0)));
    }

    #[test]
    fn test_fractional_seconds() {
        assert_eq!(
            parse_status_line("time=00:00:01.50 speed=1x"),
            Some(StatusEvent::TimeUpdate(1.5))
        );
    }

    #[test]
    fn test_unrecognized_line_is_not_an_event() {
        assert_eq!(parse_status_line("Stream mapping:"), None);
        assert_eq!(parse_status_line(""), None);
        assert_eq!(parse_status_line("time=N/A bitrate=N/A"), None);
        assert_eq!(parse_status_line("Duration: N/A, start: 0.000000"), None);
    }

    #[test]
    fn test_first_duration_wins() {
        let mut state = ProgressState::default();
        state.apply(StatusEvent::Duration(90.0));
        state.apply(StatusEvent::Duration(30.0));
        assert_eq!(state.total_secs(), Some(90.0));
    }

    #[test]
    fn test_percent_unknown_until_duration_seen() {
        let mut state = ProgressState::default();
        state.apply(StatusEvent::TimeUpdate(45.0));
        assert_eq!(state.percent(), None);
    }

    #[test]
    fn test_half_way_reports_fifty_percent() {
        // Duration: 00:01:30.00 followed by time=00:00:45.00.
        let mut state = ProgressState::default();
        state.apply(parse_status_line("Duration: 00:01:30.00, start: 0.0").unwrap());
        state.apply(parse_status_line("time=00:00:45.00 bitrate=1k").unwrap());
        let percent = state.percent().unwrap();
        assert!((percent - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_percent_is_monotonic() {
        let mut state = ProgressState::default();
        state.apply(StatusEvent::Duration(100.0));

        let mut last = 0.0;
        for secs in [10.0, 25.0, 20.0, 60.0, 55.0, 100.0] {
            state.apply(StatusEvent::TimeUpdate(secs));
            let percent = state.percent().unwrap();
            assert!(percent >= last);
            last = percent;
        }
        assert!((last - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_machine_progress_stream_updates() {
        let mut state = ProgressState::default();
        state.apply(StatusEvent::Duration(10.0));
        state.update("out_time_ms", "5000000");
        assert!((state.percent().unwrap() - 50.0).abs() < 1e-6);
        state.update("progress", "continue");
        assert!(!state.is_complete());
        state.update("progress", "end");
        assert!(state.is_complete());
    }

    #[test]
    fn test_percent_clamped_to_hundred() {
        let mut state = ProgressState::default();
        state.apply(StatusEvent::Duration(10.0));
        state.apply(StatusEvent::TimeUpdate(12.0));
        assert!((state.percent().unwrap() - 100.0).abs() < 1e-6);
    }
}
