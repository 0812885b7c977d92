use std::path::Path;

/// `exploit_name` is the exploit file's basename cut at the first `.` (§4.7)
/// — `"./sploits/sqli.py"` becomes `"sqli"`, `"runner.tar.gz"` becomes
/// `"runner"`. `Path::file_stem` only strips the last extension, which is
/// the wrong cut point for multi-dot names, so this splits the basename by
/// hand instead.
pub fn exploit_name_from_path(path: &Path) -> String {
    let basename = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    basename.split('.').next().unwrap_or(&basename).to_string()
}

/// Strips a leading `[<flag>]` prefix that some upstream game systems embed
/// in their verdict message (§4.2) so the store doesn't carry the flag
/// string twice.
pub fn strip_flag_prefix(flag: &str, message: &str) -> String {
    let prefix = format!("[{flag}]");
    message
        .strip_prefix(&prefix)
        .unwrap_or(message)
        .trim_start()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_extension() {
        assert_eq!(
            exploit_name_from_path(Path::new("./sploits/sqli.py")),
            "sqli"
        );
    }

    #[test]
    fn strips_only_first_extension() {
        assert_eq!(exploit_name_from_path(Path::new("runner.tar.gz")), "runner");
    }

    #[test]
    fn handles_no_extension() {
        assert_eq!(exploit_name_from_path(Path::new("sploit")), "sploit");
    }

    #[test]
    fn strips_flag_prefix_when_present() {
        assert_eq!(
            strip_flag_prefix("AAAA=", "[AAAA=] nice"),
            "nice"
        );
    }

    #[test]
    fn leaves_message_untouched_without_prefix() {
        assert_eq!(strip_flag_prefix("AAAA=", "nice"), "nice");
    }
}
