//! Work items - the (host, probe) pairs a run is made of

use sigprobe_core::{Host, Probe};
use std::sync::Arc;

/// One probe against one host; the unit handed to a worker
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub host: Host,
    pub probe: Arc<Probe>,
}

/// Every (probe, host) pair, probe-major and host-minor
pub fn work_items<'a>(
    probes: &'a [Arc<Probe>],
    hosts: &'a [Host],
) -> impl Iterator<Item = WorkItem> + 'a {
    probes.iter().flat_map(move |probe| {
        hosts.iter().map(move |host| WorkItem {
            host: host.clone(),
            probe: Arc::clone(probe),
        })
    })
}

/// Number of items `work_items` yields
pub fn work_item_count(probes: &[Arc<Probe>], hosts: &[Host]) -> usize {
    probes.len() * hosts.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigprobe_core::CheckLocation;

    fn probe(name: &str) -> Arc<Probe> {
        Arc::new(Probe {
            name: name.to_string(),
            severity_tag: String::new(),
            method: "GET".to_string(),
            body: String::new(),
            endpoints: vec!["/".to_string()],
            headers: Vec::new(),
            check_location: CheckLocation::ResponseBody,
            match_expression: "x".to_string(),
        })
    }

    #[test]
    fn test_probe_major_order() {
        let probes = vec![probe("p1"), probe("p2")];
        let hosts = vec![Host::new("a"), Host::new("b"), Host::new("c")];

        let pairs: Vec<_> = work_items(&probes, &hosts)
            .map(|item| format!("{}@{}", item.probe.name, item.host))
            .collect();

        assert_eq!(pairs, vec!["p1@a", "p1@b", "p1@c", "p2@a", "p2@b", "p2@c"]);
        assert_eq!(work_item_count(&probes, &hosts), 6);
    }

    #[test]
    fn test_empty_inputs() {
        let probes = vec![probe("p1")];
        assert_eq!(work_items(&probes, &[]).count(), 0);
        assert_eq!(work_items(&[], &[Host::new("a")]).count(), 0);
    }
}
