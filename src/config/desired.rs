//! Desired-state builders.
//!
//! Turn the declarative `domains.yaml` and `resources.yaml` entries into
//! the [`DesiredResourceSet`] every target of an integration converges to.

use tracing::debug;

use crate::controld::spoof_attributes;
use crate::error::ConfigError;
use crate::pangolin::ResourceFields;
use crate::resource::DesiredResourceSet;

use super::spec::{DomainEntry, ResourceEntry};

/// Expands domain entries into spoof rules keyed by hostname.
///
/// An entry with `fqdn` uses those hostnames verbatim. Otherwise every
/// short name (`name` plus `aliases`) is joined with every suffix, taken
/// from the entry or from `default_suffixes`.
///
/// # Errors
///
/// Returns `ConfigError::DuplicateName` if two entries produce the same
/// hostname.
pub fn controld_desired(
    domains: &[DomainEntry],
    default_suffixes: &[String],
) -> Result<DesiredResourceSet, ConfigError> {
    let mut desired = DesiredResourceSet::new();

    for entry in domains {
        for hostname in expand_hostnames(entry, default_suffixes) {
            if desired.contains(&hostname) {
                return Err(ConfigError::DuplicateName {
                    resource_type: String::from("hostname"),
                    name: hostname,
                });
            }
            desired.insert(hostname, spoof_attributes(&entry.ip))?;
        }
    }

    debug!("Built {} desired rules from {} domains", desired.len(), domains.len());
    Ok(desired)
}

/// Returns the hostnames generated by one domain entry.
#[must_use]
pub fn expand_hostnames(entry: &DomainEntry, default_suffixes: &[String]) -> Vec<String> {
    if let Some(fqdn) = &entry.fqdn {
        return fqdn.to_vec();
    }

    let suffixes = entry.suffixes.as_deref().unwrap_or(default_suffixes);
    std::iter::once(&entry.name)
        .chain(&entry.aliases)
        .flat_map(|short| {
            suffixes
                .iter()
                .map(move |suffix| format!("{short}.{}", suffix.trim_start_matches('.')))
        })
        .collect()
}

/// Builds private resources keyed by name.
///
/// The alias defaults to `<name>.<default_suffix>`.
///
/// # Errors
///
/// Returns `ConfigError::DuplicateName` if two entries share a name.
pub fn pangolin_desired(
    resources: &[ResourceEntry],
    default_suffix: &str,
) -> Result<DesiredResourceSet, ConfigError> {
    let mut desired = DesiredResourceSet::new();

    for entry in resources {
        if desired.contains(&entry.name) {
            return Err(ConfigError::DuplicateName {
                resource_type: String::from("resource"),
                name: entry.name.clone(),
            });
        }
        desired.insert(entry.name.clone(), resource_fields(entry, default_suffix).attributes())?;
    }

    Ok(desired)
}

/// Returns the managed settings of one resource entry.
#[must_use]
pub fn resource_fields(entry: &ResourceEntry, default_suffix: &str) -> ResourceFields {
    ResourceFields {
        destination: entry.destination.clone(),
        alias: entry
            .alias
            .clone()
            .unwrap_or_else(|| format!("{}.{default_suffix}", entry.name)),
        tcp_ports: entry.tcp_ports.clone(),
        udp_ports: entry.udp_ports.clone(),
        disable_icmp: entry.disable_icmp,
        enabled: entry.enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::OneOrMany;
    use crate::controld::ATTR_VIA;
    use crate::pangolin::ATTR_ALIAS;
    use crate::resource::AttributeValue;

    fn domain(name: &str, ip: &str) -> DomainEntry {
        DomainEntry {
            name: name.to_string(),
            ip: ip.to_string(),
            aliases: Vec::new(),
            suffixes: None,
            fqdn: None,
        }
    }

    fn resource(name: &str) -> ResourceEntry {
        ResourceEntry {
            name: name.to_string(),
            destination: String::from("10.0.0.5"),
            alias: None,
            tcp_ports: String::from("*"),
            udp_ports: String::from("*"),
            disable_icmp: false,
            enabled: true,
        }
    }

    fn suffixes(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_expand_name_and_aliases_with_suffixes() {
        let mut entry = domain("nas", "10.0.0.5");
        entry.aliases = vec![String::from("files")];

        let hosts = expand_hostnames(&entry, &suffixes(&["home.arpa", "lan"]));

        assert_eq!(
            hosts,
            vec!["nas.home.arpa", "nas.lan", "files.home.arpa", "files.lan"]
        );
    }

    #[test]
    fn test_entry_suffixes_override_defaults() {
        let mut entry = domain("nas", "10.0.0.5");
        entry.suffixes = Some(suffixes(&[".internal"]));

        assert_eq!(
            expand_hostnames(&entry, &suffixes(&["home.arpa"])),
            vec!["nas.internal"]
        );
    }

    #[test]
    fn test_fqdn_bypasses_expansion() {
        let mut entry = domain("nas", "10.0.0.5");
        entry.fqdn = Some(OneOrMany::One(String::from("storage.example.net")));

        assert_eq!(
            expand_hostnames(&entry, &suffixes(&["home.arpa"])),
            vec!["storage.example.net"]
        );
    }

    #[test]
    fn test_controld_desired_attributes() {
        let domains = vec![domain("nas", "10.0.0.5"), domain("git", "10.0.0.6")];

        let desired = controld_desired(&domains, &suffixes(&["home.arpa"])).unwrap();

        assert_eq!(desired.len(), 2);
        assert_eq!(
            desired.get("git.home.arpa").and_then(|a| a.get(ATTR_VIA)),
            Some(&AttributeValue::from("10.0.0.6"))
        );
    }

    #[test]
    fn test_controld_duplicate_hostname() {
        let mut second = domain("files", "10.0.0.6");
        second.aliases = vec![String::from("nas")];
        let domains = vec![domain("nas", "10.0.0.5"), second];

        let err = controld_desired(&domains, &suffixes(&["home.arpa"])).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::DuplicateName { ref resource_type, ref name }
                if resource_type == "hostname" && name == "nas.home.arpa"
        ));
    }

    #[test]
    fn test_no_domains_is_empty_set() {
        let desired = controld_desired(&[], &suffixes(&["home.arpa"])).unwrap();
        assert!(desired.is_empty());
    }

    #[test]
    fn test_pangolin_default_alias() {
        let mut explicit = resource("git");
        explicit.alias = Some(String::from("code.example.net"));

        let desired = pangolin_desired(&[resource("nas"), explicit], "home.arpa").unwrap();

        assert_eq!(
            desired.get("nas").and_then(|a| a.get(ATTR_ALIAS)),
            Some(&AttributeValue::from("nas.home.arpa"))
        );
        assert_eq!(
            desired.get("git").and_then(|a| a.get(ATTR_ALIAS)),
            Some(&AttributeValue::from("code.example.net"))
        );
    }

    #[test]
    fn test_pangolin_duplicate_name() {
        let err = pangolin_desired(&[resource("nas"), resource("nas")], "home.arpa").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { .. }));
    }
}
