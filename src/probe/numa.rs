//! NUMA node discovery and core-to-node mapping.
//!
//! The node inventory comes from the sysfs node tree and per-core membership
//! from the `cpu<C>/node<N>` marker directories, both part of the stable
//! Linux sysfs ABI. Discovery always produces a total mapping over all
//! configurable cores: machines without NUMA support, and cores whose
//! membership cannot be determined, land on node 0.

use std::fs;
use std::path::Path;

use tracing::warn;

/// Core-to-node mapping plus its derived inverse views.
///
/// The mapping is total: every core id below `max_cores` resolves to a node,
/// and every core appears in exactly one node's core list. Inverse views are
/// derived from global core id order, so two runs over the same hardware
/// produce identical structures regardless of directory iteration order.
#[derive(Debug, Clone)]
pub struct NumaTopology {
    max_cores: usize,
    node_count: usize,
    core_to_node: Vec<usize>,
    node_to_cores: Vec<Vec<usize>>,
    core_index_in_node: Vec<usize>,
}

impl NumaTopology {
    /// Discover the NUMA layout for `max_cores` configurable cores.
    ///
    /// `node_root` is the sysfs node metadata tree and `cpu_root` the per-cpu
    /// tree holding the membership markers. A missing node tree means the
    /// kernel has no NUMA support and yields the single-node layout.
    pub fn detect(max_cores: usize, node_root: &Path, cpu_root: &Path) -> Self {
        let entries = match fs::read_dir(node_root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "could not read {}: {}; assuming a single NUMA node",
                    node_root.display(),
                    e
                );
                return Self::single_node(max_cores);
            }
        };

        let mut node_count = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| is_node_entry(&entry.file_name()))
            .count();
        if node_count == 0 {
            warn!(
                "no NUMA nodes found under {}; assuming a single NUMA node",
                node_root.display()
            );
            node_count = 1;
        }

        let core_to_node = (0..max_cores)
            .map(|core| match resolve_node(cpu_root, core, node_count) {
                Some(node) => node,
                None => {
                    warn!("could not determine NUMA node for core {}", core);
                    0
                }
            })
            .collect();

        Self::from_mapping(node_count, core_to_node)
    }

    /// Build a topology from an explicit mapping.
    ///
    /// The inverse views are derived here, in ascending core id order.
    /// Panics if any entry of `core_to_node` is `node_count` or larger.
    pub fn from_mapping(node_count: usize, core_to_node: Vec<usize>) -> Self {
        let mut node_to_cores = vec![Vec::new(); node_count];
        let mut core_index_in_node = Vec::with_capacity(core_to_node.len());

        for (core, &node) in core_to_node.iter().enumerate() {
            core_index_in_node.push(node_to_cores[node].len());
            node_to_cores[node].push(core);
        }

        NumaTopology {
            max_cores: core_to_node.len(),
            node_count,
            core_to_node,
            node_to_cores,
            core_index_in_node,
        }
    }

    /// The layout used when the kernel exposes no NUMA information.
    pub fn single_node(max_cores: usize) -> Self {
        Self::from_mapping(1, vec![0; max_cores])
    }

    /// Number of configurable cores covered by the mapping.
    pub fn max_cores(&self) -> usize {
        self.max_cores
    }

    /// Number of NUMA nodes, at least 1.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// The node a core belongs to.
    pub fn node_of_core(&self, core: usize) -> usize {
        self.core_to_node[core]
    }

    /// Cores belonging to a node, in ascending core id order.
    pub fn cores_of_node(&self, node: usize) -> &[usize] {
        &self.node_to_cores[node]
    }

    /// Position of a core within its node's core list.
    pub fn core_index_in_node(&self, core: usize) -> usize {
        self.core_index_in_node[core]
    }

    /// The full core-to-node mapping, indexed by core id.
    pub fn core_to_node(&self) -> &[usize] {
        &self.core_to_node
    }
}

/// Whether a directory entry names a NUMA node (`node0`, `node12`, ...).
fn is_node_entry(name: &std::ffi::OsStr) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    match name.strip_prefix("node") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Find the node a core belongs to by probing its membership markers.
fn resolve_node(cpu_root: &Path, core: usize, node_count: usize) -> Option<usize> {
    (0..node_count).find(|node| cpu_root.join(format!("cpu{}/node{}", core, node)).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn from_mapping_builds_inverse_views() {
        let numa = NumaTopology::from_mapping(2, vec![1, 1, 0, 0]);

        assert_eq!(numa.max_cores(), 4);
        assert_eq!(numa.node_count(), 2);
        assert_eq!(numa.cores_of_node(0), &[2, 3]);
        assert_eq!(numa.cores_of_node(1), &[0, 1]);
        assert_eq!(
            (0..4).map(|c| numa.core_index_in_node(c)).collect::<Vec<_>>(),
            vec![0, 1, 0, 1]
        );
    }

    #[test]
    fn mapping_invariants_hold() {
        let numa = NumaTopology::from_mapping(3, vec![2, 0, 2, 1, 0, 0]);

        // Partition: every core appears in exactly one node list.
        let mut seen = vec![0usize; numa.max_cores()];
        for node in 0..numa.node_count() {
            for &core in numa.cores_of_node(node) {
                seen[core] += 1;
                assert_eq!(numa.node_of_core(core), node);
            }
        }
        assert!(seen.iter().all(|&count| count == 1));

        // Inverse identity: a core's index points back at itself.
        for core in 0..numa.max_cores() {
            let node = numa.node_of_core(core);
            assert_eq!(numa.cores_of_node(node)[numa.core_index_in_node(core)], core);
        }
    }

    #[test]
    fn missing_node_tree_degrades_to_single_node() {
        let dir = tempdir().unwrap();
        let numa = NumaTopology::detect(
            4,
            &dir.path().join("does-not-exist"),
            &dir.path().join("cpu"),
        );

        assert_eq!(numa.node_count(), 1);
        assert_eq!(numa.core_to_node(), &[0, 0, 0, 0]);
    }

    #[test]
    fn empty_node_tree_degrades_to_single_node() {
        let dir = tempdir().unwrap();
        let node_root = dir.path().join("node");
        fs::create_dir(&node_root).unwrap();

        let numa = NumaTopology::detect(2, &node_root, &dir.path().join("cpu"));

        assert_eq!(numa.node_count(), 1);
        assert_eq!(numa.core_to_node(), &[0, 0]);
    }

    #[test]
    fn detects_two_nodes_from_membership_markers() {
        let dir = tempdir().unwrap();
        let node_root = dir.path().join("node");
        let cpu_root = dir.path().join("cpu");
        for node in ["node0", "node1"] {
            fs::create_dir_all(node_root.join(node)).unwrap();
        }
        // Non-node entries must not inflate the count.
        fs::create_dir_all(node_root.join("possible")).unwrap();
        for (core, node) in [(0, 1), (1, 1), (2, 0), (3, 0)] {
            fs::create_dir_all(cpu_root.join(format!("cpu{}/node{}", core, node))).unwrap();
        }

        let numa = NumaTopology::detect(4, &node_root, &cpu_root);

        assert_eq!(numa.node_count(), 2);
        assert_eq!(numa.core_to_node(), &[1, 1, 0, 0]);
        assert_eq!(numa.cores_of_node(0), &[2, 3]);
        assert_eq!(numa.cores_of_node(1), &[0, 1]);
    }

    #[test]
    fn unmarked_core_falls_back_to_node_zero() {
        let dir = tempdir().unwrap();
        let node_root = dir.path().join("node");
        let cpu_root = dir.path().join("cpu");
        for node in ["node0", "node1"] {
            fs::create_dir_all(node_root.join(node)).unwrap();
        }
        fs::create_dir_all(cpu_root.join("cpu0/node1")).unwrap();
        // cpu1 has no membership marker at all.
        fs::create_dir_all(cpu_root.join("cpu1")).unwrap();

        let numa = NumaTopology::detect(2, &node_root, &cpu_root);

        assert_eq!(numa.core_to_node(), &[1, 0]);
    }

    #[test]
    fn node_entry_names_are_strict() {
        use std::ffi::OsStr;

        assert!(is_node_entry(OsStr::new("node0")));
        assert!(is_node_entry(OsStr::new("node15")));
        assert!(!is_node_entry(OsStr::new("node")));
        assert!(!is_node_entry(OsStr::new("nodeX")));
        assert!(!is_node_entry(OsStr::new("has_cpu")));
        assert!(!is_node_entry(OsStr::new("online")));
    }
}
