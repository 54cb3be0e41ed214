//! Name generation for cloned machines
//!
//! Clones are named `<prefix>-<unix-nanos>-<suffix>`: the template's name up
//! to its first `-`, the creation time in nanoseconds and a short random
//! suffix so two clones made within one clock tick still differ. Long
//! prefixes are cut so the whole name fits a DNS label.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::Error;

/// Length of the random suffix appended to generated names
pub const SUFFIX_LEN: usize = 5;

/// Characters used for the random suffix (DNS-1123 safe)
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Longest generated name; machine names become node hostnames
pub const MAX_NAME_LEN: usize = 63;

/// Digits reserved for the nanosecond timestamp (u64 nanos fit in 20)
const TIMESTAMP_DIGITS: usize = 20;

/// Longest prefix kept from the template name
const MAX_PREFIX_LEN: usize = MAX_NAME_LEN - TIMESTAMP_DIGITS - SUFFIX_LEN - 2;

/// Extract the prefix of a template machine name.
///
/// Returns `None` when the name has no `-` separated prefix (e.g. "worker"
/// or "-worker").
pub fn name_prefix(template_name: &str) -> Option<&str> {
    match template_name.split_once('-') {
        Some((prefix, _)) if !prefix.is_empty() => Some(prefix),
        _ => None,
    }
}

/// Random lowercase alphanumeric string of length `n`
pub fn random_suffix(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}

/// Generate a fresh machine name from a template machine's name
pub fn generate_machine_name(template_name: &str) -> Result<String, Error> {
    let prefix = name_prefix(template_name)
        .ok_or_else(|| Error::InvalidTemplateName(template_name.to_string()))?;
    let prefix = match prefix.char_indices().nth(MAX_PREFIX_LEN) {
        Some((end, _)) => &prefix[..end],
        None => prefix,
    };
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Ok(format!("{prefix}-{nanos}-{}", random_suffix(SUFFIX_LEN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn prefix_is_text_before_first_dash() {
        assert_eq!(name_prefix("worker-0-abc"), Some("worker"));
        assert_eq!(name_prefix("node-1"), Some("node"));
    }

    #[test]
    fn names_without_prefix_are_rejected() {
        assert_eq!(name_prefix("worker"), None);
        assert_eq!(name_prefix("-worker"), None);
        assert!(matches!(
            generate_machine_name("worker"),
            Err(Error::InvalidTemplateName(name)) if name == "worker"
        ));
    }

    #[test]
    fn generated_name_has_prefix_timestamp_and_suffix() {
        let name = generate_machine_name("myfleet-node-0").unwrap();
        let parts: Vec<&str> = name.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "myfleet");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn generated_names_are_dns_safe() {
        let name = generate_machine_name("node-0").unwrap();
        assert!(name.len() <= 63);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn long_prefixes_are_cut_to_fit_a_label() {
        let template = format!("{}-node-0", "w".repeat(300));
        let name = generate_machine_name(&template).unwrap();

        assert!(name.len() <= MAX_NAME_LEN, "{} chars", name.len());
        let prefix = name.split('-').next().unwrap();
        assert_eq!(prefix.len(), MAX_PREFIX_LEN);
        assert!(prefix.chars().all(|c| c == 'w'));
    }

    #[test]
    fn back_to_back_names_are_unique() {
        let names: HashSet<String> = (0..200)
            .map(|_| generate_machine_name("node-0").unwrap())
            .collect();
        assert_eq!(names.len(), 200);
    }
}
