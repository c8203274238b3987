use super::types::PackageDetails;

/// Package names printed by `pm list packages`, with the `package:` prefix
/// stripped.
pub fn decode_package_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pulls `versionName`, `versionCode` and the enabled flag out of
/// `dumpsys package <pkg>`. The first occurrence of each key wins.
pub fn decode_package_dump(text: &str) -> PackageDetails {
    let mut details = PackageDetails {
        enabled: true,
        ..PackageDetails::default()
    };

    for line in text.lines() {
        let line = line.trim();
        if details.version.is_none() {
            if let Some(value) = line.strip_prefix("versionName=") {
                details.version = Some(value.trim().to_string());
                continue;
            }
        }
        if details.version_code.is_none() {
            if let Some(rest) = line.strip_prefix("versionCode=") {
                let code = rest.split_whitespace().next().unwrap_or_default();
                details.version_code = Some(code.to_string());
                continue;
            }
        }
        // "enabled=2" (COMPONENT_ENABLED_STATE_DISABLED) and "enabled=3" mean disabled
        if line.contains("enabled=false") || line.contains("enabled=2") || line.contains("enabled=3")
        {
            details.enabled = false;
        }
    }

    details
}

/// `pm path <pkg>` output points into a system partition.
pub fn is_system_path(text: &str) -> bool {
    text.lines().any(|line| {
        let path = line.trim().trim_start_matches("package:");
        ["/system/", "/product/", "/vendor/", "/system_ext/", "/apex/"]
            .iter()
            .any(|prefix| path.starts_with(prefix))
    })
}

/// Readable name derived from a package name: the second dotted segment,
/// title-cased (`com.whatsapp.w4b` -> `Whatsapp`).
pub fn display_name_for(package: &str) -> String {
    let segment = package
        .split('.')
        .nth(1)
        .filter(|s| !s.is_empty())
        .unwrap_or(package);
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Package names are dotted Java identifiers; anything else is refused before
/// it reaches a shell.
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_list() {
        let text = "package:com.example.app\npackage:org.mozilla.firefox\n\nnoise\n";
        assert_eq!(
            decode_package_list(text),
            vec!["com.example.app".to_string(), "org.mozilla.firefox".to_string()]
        );
    }

    #[test]
    fn test_package_dump() {
        let text = "\
Packages:
  Package [com.example.app] (1a2b3c):
    versionCode=42 minSdk=24 targetSdk=34
    versionName=1.4.2
    User 0: ceDataInode=1 installed=true hidden=false suspended=false stopped=false notLaunched=false enabled=0
  Package [com.example.app] (hidden):
    versionName=0.9
";
        let details = decode_package_dump(text);
        assert_eq!(details.version.as_deref(), Some("1.4.2"));
        assert_eq!(details.version_code.as_deref(), Some("42"));
        assert!(details.enabled);

        let disabled = decode_package_dump("    User 0: installed=true enabled=3\n");
        assert!(!disabled.enabled);
        assert_eq!(disabled.version, None);
    }

    #[test]
    fn test_display_name_and_system_path() {
        assert_eq!(display_name_for("com.whatsapp.w4b"), "Whatsapp");
        assert_eq!(display_name_for("org.MOZILLA.firefox"), "Mozilla");
        assert_eq!(display_name_for("android"), "Android");

        assert!(is_system_path("package:/system/app/Camera/Camera.apk\n"));
        assert!(!is_system_path("package:/data/app/~~x==/com.example.app/base.apk\n"));
    }

    #[test]
    fn test_package_name_validation() {
        assert!(is_valid_package_name("com.example.app_2"));
        assert!(!is_valid_package_name("com.example.app; reboot"));
        assert!(!is_valid_package_name("com..example"));
        assert!(!is_valid_package_name(""));
    }
}
