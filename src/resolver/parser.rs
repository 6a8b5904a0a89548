//! Parser for yt-dlp command output

use crate::error::ResolutionError;
use std::path::PathBuf;
use std::str;

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command exited successfully (exit code 0)
    Success,
    /// The command exited with a non-zero exit code
    Failure,
}

impl ExitStatus {
    /// Returns `true` if the exit status represents success
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<bool> for ExitStatus {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

// Lower-cased stderr fragments, checked in order.
const NOT_FOUND_MARKERS: &[&str] = &[
    "no video results",
    "no results",
    "video unavailable",
    "this video is not available",
    "private video",
    "has been removed",
];

const NETWORK_MARKERS: &[&str] = &[
    "timed out",
    "temporary failure in name resolution",
    "name or service not known",
    "getaddrinfo failed",
    "connection reset",
    "connection refused",
    "connection aborted",
    "network is unreachable",
    "http error 429",
    "http error 500",
    "http error 502",
    "http error 503",
    "http error 504",
    "unable to download webpage",
    "remote end closed connection",
];

/// Interpret the output of one `yt-dlp` invocation
///
/// On success the final file path is the last non-empty line of stdout (the
/// command is run with `--print after_move:filepath`). A successful run that
/// printed nothing means the search matched no entry.
pub fn parse_ytdlp_output(
    query: &str,
    stdout: &[u8],
    stderr: &[u8],
    exit_status: ExitStatus,
) -> Result<PathBuf, ResolutionError> {
    if !exit_status.is_success() {
        return Err(classify_failure(query, stderr));
    }

    let output = String::from_utf8_lossy(stdout);
    match output.lines().map(str::trim).rfind(|line| !line.is_empty()) {
        Some(path) => Ok(PathBuf::from(path)),
        None => Err(ResolutionError::NotFound {
            query: query.to_string(),
        }),
    }
}

/// Map a failed run's stderr to a resolution error
pub fn classify_failure(query: &str, stderr: &[u8]) -> ResolutionError {
    let error_output = String::from_utf8_lossy(stderr);
    let lower = error_output.to_lowercase();
    let reason = failure_reason(&error_output);

    if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
        return ResolutionError::NotFound {
            query: query.to_string(),
        };
    }

    if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        return ResolutionError::Network {
            query: query.to_string(),
            reason,
        };
    }

    ResolutionError::Extraction {
        query: query.to_string(),
        reason,
    }
}

/// Pick the most useful line of stderr: the last `ERROR:` line, else the last line
fn failure_reason(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find_map(|l| l.strip_prefix("ERROR:"))
        .map(|l| l.trim().to_string())
        .or_else(|| lines.last().map(|l| l.to_string()))
        .unwrap_or_else(|| "yt-dlp exited with an error and no output".to_string())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "Blue Monday New Order audio";

    #[test]
    fn success_returns_last_printed_path() {
        let stdout = b"/tmp/job/Blue Monday.webm\n/tmp/job/Blue Monday.mp3\n\n";
        let path = parse_ytdlp_output(QUERY, stdout, b"", ExitStatus::Success).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/job/Blue Monday.mp3"));
    }

    #[test]
    fn success_without_output_means_no_match() {
        let result = parse_ytdlp_output(QUERY, b"  \n", b"", ExitStatus::Success);
        assert_eq!(
            result,
            Err(ResolutionError::NotFound {
                query: QUERY.to_string()
            })
        );
    }

    #[test]
    fn unavailable_video_is_not_found() {
        let stderr = b"ERROR: [youtube] abc123: Video unavailable\n";
        let result = parse_ytdlp_output(QUERY, b"", stderr, ExitStatus::Failure);
        assert!(matches!(result, Err(ResolutionError::NotFound { .. })));
    }

    #[test]
    fn transport_failures_are_network_errors() {
        let stderr = b"WARNING: retrying\nERROR: Unable to download webpage: <urlopen error [Errno -3] Temporary failure in name resolution>\n";
        match classify_failure(QUERY, stderr) {
            ResolutionError::Network { query, reason } => {
                assert_eq!(query, QUERY);
                assert!(reason.starts_with("Unable to download webpage"));
            }
            other => panic!("expected Network, got {other:?}"),
        }

        let throttled = b"ERROR: unable to download video data: HTTP Error 429: Too Many Requests";
        assert!(matches!(
            classify_failure(QUERY, throttled),
            ResolutionError::Network { .. }
        ));
    }

    #[test]
    fn postprocessor_failures_are_extraction_errors() {
        let stderr = b"ERROR: Postprocessing: ffprobe and ffmpeg not found. Please install or provide the path using --ffmpeg-location\n";
        match classify_failure(QUERY, stderr) {
            ResolutionError::Extraction { reason, .. } => {
                assert!(reason.contains("ffmpeg not found"));
            }
            other => panic!("expected Extraction, got {other:?}"),
        }
    }

    #[test]
    fn reason_falls_back_to_last_line_or_placeholder() {
        match classify_failure(QUERY, b"something odd\nsegfault\n") {
            ResolutionError::Extraction { reason, .. } => assert_eq!(reason, "segfault"),
            other => panic!("expected Extraction, got {other:?}"),
        }

        match classify_failure(QUERY, b"") {
            ResolutionError::Extraction { reason, .. } => {
                assert!(reason.contains("no output"))
            }
            other => panic!("expected Extraction, got {other:?}"),
        }
    }

    #[test]
    fn non_utf8_output_does_not_panic() {
        let stdout = [0xff, 0xfe, b'\n', b'/', b'a', b'.', b'm', b'p', b'3'];
        let path = parse_ytdlp_output(QUERY, &stdout, b"", ExitStatus::Success).unwrap();
        assert_eq!(path, PathBuf::from("/a.mp3"));
    }
}
