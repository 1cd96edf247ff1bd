//! `pm list packages` output parsing
//!
//! Understands the `-U` listing (`package:<name> uid:<uid>[,<uid>...]`),
//! optionally combined with `-f` (`package:<apk path>=<name> uid:...`).

use tracing::warn;

use bindguard_access::Uid;

/// Parse `pm list packages -U` output into `(package, uid)` pairs.
///
/// A package installed for several users yields one pair per uid.
/// Malformed lines are logged and skipped.
pub fn parse_package_list(output: &str) -> Vec<(String, Uid)> {
    let mut packages = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut name = None;
        let mut uids = Vec::new();

        for part in line.split_whitespace() {
            if let Some(value) = part.strip_prefix("package:") {
                // `-f` puts the apk path first
                let value = match value.rfind('=') {
                    Some(idx) => &value[idx + 1..],
                    None => value,
                };
                if !value.is_empty() {
                    name = Some(value.to_string());
                }
            } else if let Some(value) = part.strip_prefix("uid:") {
                uids = value.split(',').filter_map(|uid| uid.parse::<Uid>().ok()).collect();
            }
        }

        match name {
            Some(name) if !uids.is_empty() => {
                packages.extend(uids.into_iter().map(|uid| (name.clone(), uid)));
            }
            _ => warn!("invalid output for list packages: {}", line),
        }
    }

    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uid_listing() {
        let output = "package:com.android.settings uid:1000\n\
                      package:com.example.app uid:10057\n\
                      \n\
                      package:com.android.shell uid:2000\n";
        let packages = parse_package_list(output);

        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0], ("com.android.settings".to_string(), Uid(1000)));
        assert_eq!(packages[1], ("com.example.app".to_string(), Uid(10057)));
    }

    #[test]
    fn test_parse_with_apk_path() {
        let output =
            "package:/data/app/~~xyz==/com.example.app-1/base.apk=com.example.app uid:10057";
        let packages = parse_package_list(output);
        assert_eq!(packages, vec![("com.example.app".to_string(), Uid(10057))]);
    }

    #[test]
    fn test_parse_multi_user() {
        let packages = parse_package_list("package:com.example.app uid:10057,1010057");
        assert_eq!(
            packages,
            vec![
                ("com.example.app".to_string(), Uid(10057)),
                ("com.example.app".to_string(), Uid(1_010_057)),
            ]
        );
    }

    #[test]
    fn test_skips_malformed_lines() {
        let output = "package:com.example.nouid\n\
                      uid:10001\n\
                      Error: something went wrong\n\
                      package:com.example.app uid:abc\n\
                      package:com.example.ok uid:10002";
        let packages = parse_package_list(output);
        assert_eq!(packages, vec![("com.example.ok".to_string(), Uid(10002))]);
    }
}
