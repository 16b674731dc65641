//! Validation for user-entered instance names and ports.

use once_cell::sync::Lazy;
use regex::Regex;
use tdconsole_types::InstanceRecord;

static INSTANCE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("instance name pattern"));

/// True when `name` is a usable instance name: letters, digits, `-` and `_`,
/// not starting with a separator. Rejects anything that could smuggle path
/// components or option markers into a `tdserver` invocation.
pub fn is_valid_instance_name(name: &str) -> bool {
    INSTANCE_NAME.is_match(name)
}

/// True when `name` already belongs to a known instance.
pub fn name_in_use(records: &[InstanceRecord], name: &str) -> bool {
    records.iter().any(|record| record.name == name)
}

/// Parse and range-check a port entry (1–65535).
pub fn parse_port(value: &str) -> Option<u16> {
    match value.parse::<u16>() {
        Ok(0) => None,
        Ok(port) => Some(port),
        Err(_) => None,
    }
}

/// Name of the instance (other than `current`) already bound to `port`, if any.
pub fn port_in_use(records: &[InstanceRecord], port: u16, current: &str) -> Option<String> {
    let port = port.to_string();
    records
        .iter()
        .filter(|record| record.name != current)
        .find(|record| record.arg_ext == port || record.arg_int == port)
        .map(|record| record.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        assert!(is_valid_instance_name("demo"));
        assert!(is_valid_instance_name("demo-2"));
        assert!(is_valid_instance_name("a_b"));
    }

    #[test]
    fn rejects_separator_prefixes_and_specials() {
        assert!(!is_valid_instance_name(""));
        assert!(!is_valid_instance_name("-rf"));
        assert!(!is_valid_instance_name("_x"));
        assert!(!is_valid_instance_name("a b"));
        assert!(!is_valid_instance_name("../etc"));
    }

    #[test]
    fn port_parsing_rejects_zero_and_garbage() {
        assert_eq!(parse_port("2457"), Some(2457));
        assert_eq!(parse_port("0"), None);
        assert_eq!(parse_port("65536"), None);
        assert_eq!(parse_port("abc"), None);
    }

    #[test]
    fn port_conflicts_ignore_the_current_instance() {
        let mut a = InstanceRecord::not_created("a");
        a.arg_ext = "9000".into();
        let b = InstanceRecord::not_created("b");
        let records = vec![a, b];
        assert_eq!(port_in_use(&records, 9000, "b"), Some("a".to_string()));
        assert_eq!(port_in_use(&records, 9000, "a"), None);
        assert!(name_in_use(&records, "a"));
        assert!(!name_in_use(&records, "c"));
    }
}
