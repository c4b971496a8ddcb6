//! Tokeniser.
//!
//! Two-level tokenisation: pipeline split on `|` first, then stage split
//! into command name + argument tail.

/// Splits an input line into pipeline stage strings on `|`. Leading and
/// trailing whitespace on each stage is trimmed; a line ending in `|`
/// produces one trailing empty segment that is suppressed. A
/// whitespace-only line yields no stages.
///
/// A stage that is empty *after trimming but before the terminating `|`*
/// (e.g. `a||b`, or a line of only `|` characters) is preserved as an
/// empty string, not suppressed: the pipeline builder treats it as an
/// unknown-command error.
pub fn split_pipeline(line: &str) -> Vec<String> {
    let trimmed = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
    if trimmed.trim().is_empty() {
        return Vec::new();
    }
    let mut stages: Vec<String> = trimmed.split('|').map(|s| s.trim().to_string()).collect();
    // A line ending in `|` produces one trailing empty segment from `split`
    // that isn't itself a stage the caller typed; drop just that one. A
    // line of only `|` characters still yields its empty interior stages
    // so the pipeline builder can report "command not found" for them.
    if stages.len() > 1 && stages.last().map_or(false, |s| s.is_empty()) {
        stages.pop();
    }
    stages
}

/// Splits a stage into its command name and argument tail. The first
/// whitespace-separated word is the command name; the remainder
/// (verbatim, not re-trimmed beyond the single separating space) is the
/// argument tail, or `None` if there isn't one.
pub fn split_stage(stage: &str) -> (String, Option<String>) {
    match stage.find(char::is_whitespace) {
        None => (stage.to_string(), None),
        Some(idx) => {
            let name = stage[..idx].to_string();
            let rest = stage[idx..].trim_start();
            if rest.is_empty() {
                (name, None)
            } else {
                (name, Some(rest.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stage() {
        assert_eq!(split_pipeline("who"), vec!["who".to_string()]);
    }

    #[test]
    fn multi_stage_pipeline() {
        assert_eq!(
            split_pipeline("yell hi | cat"),
            vec!["yell hi".to_string(), "cat".to_string()]
        );
    }

    #[test]
    fn whitespace_only_line_yields_no_stages() {
        assert!(split_pipeline("   ").is_empty());
        assert!(split_pipeline("").is_empty());
    }

    #[test]
    fn trailing_pipe_is_suppressed() {
        assert_eq!(split_pipeline("who |"), vec!["who".to_string()]);
    }

    #[test]
    fn only_pipes_yields_empty_stage_errors() {
        assert_eq!(split_pipeline("|"), vec!["".to_string()]);
        assert_eq!(split_pipeline("||"), vec!["".to_string(), "".to_string()]);
    }

    #[test]
    fn stage_split_name_and_tail() {
        assert_eq!(
            split_stage("tell bob hi there"),
            ("tell".to_string(), Some("bob hi there".to_string()))
        );
        assert_eq!(split_stage("who"), ("who".to_string(), None));
        assert_eq!(split_stage("who   "), ("who".to_string(), None));
    }
}
