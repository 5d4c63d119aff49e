//! Device Directory Resolver
//!
//! Turns the configured target into the flat list of leaf devices to draw.
//! Groups and subgroups are expanded depth-first; each group's children are
//! fetched page by page until the backend signals the end (explicitly via
//! `has_more`, or by returning a short page).

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::capability::Inventory;
use crate::config::SyncSettings;
use crate::error::{MapSyncError, SyncResult};
use crate::types::{Device, DeviceId};

/// Resolves targets into devices through the inventory capability
#[derive(Clone)]
pub struct DirectoryResolver {
    inventory: Arc<dyn Inventory>,
    page_size: usize,
    group_types: Vec<String>,
}

impl DirectoryResolver {
    pub fn new(inventory: Arc<dyn Inventory>, settings: &SyncSettings) -> Self {
        Self {
            inventory,
            page_size: settings.page_size.max(1),
            group_types: settings.group_types.clone(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// True if the object's type tag is one of the group tags
    pub fn is_group(&self, device: &Device) -> bool {
        device
            .device_type
            .as_deref()
            .is_some_and(|t| self.group_types.iter().any(|g| g == t))
    }

    /// Fetch the target object itself
    pub async fn lookup(&self, target: &DeviceId) -> SyncResult<Device> {
        self.inventory
            .get_target(target)
            .await
            .map_err(|source| MapSyncError::LookupFailure {
                id: target.clone(),
                source,
            })
    }

    /// Resolve a target into the devices to display
    ///
    /// A plain device resolves to itself. For a group, a failure listing the
    /// group's own children is returned; a failure inside a nested subgroup
    /// only drops that subgroup.
    #[instrument(skip(self))]
    pub async fn resolve(&self, target: &DeviceId) -> SyncResult<Vec<Device>> {
        let root = self.lookup(target).await?;
        if self.is_group(&root) {
            self.expand(&root.id).await
        } else {
            Ok(vec![root])
        }
    }

    /// Expand a group into its leaf devices
    pub async fn expand(&self, group: &DeviceId) -> SyncResult<Vec<Device>> {
        let mut devices = Vec::new();
        let mut visited: HashSet<DeviceId> = HashSet::new();
        let mut seen: HashSet<DeviceId> = HashSet::new();
        let mut pending = vec![group.clone()];
        visited.insert(group.clone());

        while let Some(current) = pending.pop() {
            let children = match self.list_children(&current).await {
                Ok(children) => children,
                Err(e) if &current == group => return Err(e),
                Err(e) => {
                    warn!("Abandoning subgroup {}: {}", current, e);
                    continue;
                }
            };

            // Keep sibling order: subgroups are visited in the order listed
            let mut subgroups = Vec::new();
            for child in children {
                if self.is_group(&child) {
                    if visited.insert(child.id.clone()) {
                        subgroups.push(child.id);
                    }
                } else if seen.insert(child.id.clone()) {
                    devices.push(child);
                } else {
                    debug!("{} is listed under several groups, keeping the first", child.id);
                }
            }
            pending.extend(subgroups.into_iter().rev());
        }

        debug!("Group {} expanded to {} devices", group, devices.len());
        Ok(devices)
    }

    /// All direct children of `id`, accumulated across pages
    pub async fn list_children(&self, id: &DeviceId) -> SyncResult<Vec<Device>> {
        let mut children = Vec::new();
        let mut page_no = 1u32;

        loop {
            let page = self
                .inventory
                .list_children(id, page_no, self.page_size)
                .await
                .map_err(|source| MapSyncError::LookupFailure {
                    id: id.clone(),
                    source,
                })?;

            let fetched = page.items.len();
            children.extend(page.items);

            // Short page is terminal unless the backend says otherwise
            let more = page.has_more.unwrap_or(fetched >= self.page_size);
            if !more || fetched == 0 {
                break;
            }
            page_no += 1;
        }

        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ChildPage;
    use crate::error::CapabilityError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Inventory backed by a parent -> children table
    #[derive(Default)]
    struct TreeInventory {
        objects: HashMap<DeviceId, Device>,
        children: HashMap<DeviceId, Vec<Device>>,
        broken: HashSet<DeviceId>,
        pages_fetched: Mutex<Vec<(DeviceId, u32)>>,
    }

    impl TreeInventory {
        fn add(&mut self, parent: Option<&str>, device: Device) {
            if let Some(parent) = parent {
                self.children
                    .entry(DeviceId::from(parent))
                    .or_default()
                    .push(device.clone());
            }
            self.objects.insert(device.id.clone(), device);
        }
    }

    #[async_trait]
    impl Inventory for TreeInventory {
        async fn get_target(&self, id: &DeviceId) -> Result<Device, CapabilityError> {
            self.objects
                .get(id)
                .cloned()
                .ok_or_else(|| CapabilityError::NotFound(id.clone()))
        }

        async fn list_children(
            &self,
            id: &DeviceId,
            page: u32,
            page_size: usize,
        ) -> Result<ChildPage, CapabilityError> {
            self.pages_fetched.lock().push((id.clone(), page));
            if self.broken.contains(id) {
                return Err(CapabilityError::Status { code: 500 });
            }
            let all = self.children.get(id).cloned().unwrap_or_default();
            let start = (page as usize - 1) * page_size;
            let items = all.into_iter().skip(start).take(page_size).collect();
            Ok(ChildPage::new(items))
        }

        async fn supported_series(&self, _id: &DeviceId) -> Result<Vec<String>, CapabilityError> {
            Ok(Vec::new())
        }

        async fn supported_measurements(
            &self,
            _id: &DeviceId,
        ) -> Result<Vec<String>, CapabilityError> {
            Ok(Vec::new())
        }
    }

    fn group(id: &str) -> Device {
        Device::new(id, format!("group {id}")).with_type("c8y_DeviceGroup")
    }

    fn sensor(id: &str) -> Device {
        Device::new(id, format!("sensor {id}")).with_type("c8y_Sensor")
    }

    fn resolver(inventory: TreeInventory) -> (DirectoryResolver, Arc<TreeInventory>) {
        let inventory = Arc::new(inventory);
        let resolver = DirectoryResolver::new(inventory.clone(), &SyncSettings::default());
        (resolver, inventory)
    }

    #[tokio::test]
    async fn test_plain_device_resolves_to_itself() {
        let mut inv = TreeInventory::default();
        inv.add(None, sensor("1"));
        let (resolver, inv) = resolver(inv);

        let devices = resolver.resolve(&DeviceId::from("1")).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert!(inv.pages_fetched.lock().is_empty());
    }

    #[tokio::test]
    async fn test_51_children_take_two_pages() {
        let mut inv = TreeInventory::default();
        inv.add(None, group("g"));
        for i in 0..51 {
            inv.add(Some("g"), sensor(&format!("d{i}")));
        }
        let (resolver, inv) = resolver(inv);

        let devices = resolver.resolve(&DeviceId::from("g")).await.unwrap();
        assert_eq!(devices.len(), 51);
        assert_eq!(inv.pages_fetched.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_nested_subgroups_are_flattened() {
        let mut inv = TreeInventory::default();
        inv.add(None, group("root"));
        inv.add(Some("root"), sensor("a"));
        inv.add(Some("root"), group("floor1"));
        inv.add(Some("floor1"), sensor("b"));
        inv.add(Some("floor1"), sensor("c"));
        let (resolver, _) = resolver(inv);

        let ids: Vec<String> = resolver
            .resolve(&DeviceId::from("root"))
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_broken_subgroup_keeps_siblings() {
        let mut inv = TreeInventory::default();
        inv.add(None, group("root"));
        inv.add(Some("root"), sensor("a"));
        inv.add(Some("root"), group("bad"));
        inv.add(Some("bad"), sensor("lost"));
        inv.broken.insert(DeviceId::from("bad"));
        let (resolver, _) = resolver(inv);

        let devices = resolver.resolve(&DeviceId::from("root")).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id.as_str(), "a");
    }

    #[tokio::test]
    async fn test_device_in_two_subgroups_is_resolved_once() {
        let mut inv = TreeInventory::default();
        inv.add(None, group("root"));
        inv.add(Some("root"), group("s1"));
        inv.add(Some("root"), group("s2"));
        inv.add(Some("s1"), sensor("x"));
        inv.add(Some("s1"), sensor("y"));
        inv.add(Some("s2"), sensor("x"));
        let (resolver, _) = resolver(inv);

        let devices = resolver.resolve(&DeviceId::from("root")).await.unwrap();
        let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_broken_root_group_is_a_lookup_failure() {
        let mut inv = TreeInventory::default();
        inv.add(None, group("root"));
        inv.broken.insert(DeviceId::from("root"));
        let (resolver, _) = resolver(inv);

        let result = resolver.resolve(&DeviceId::from("root")).await;
        assert!(matches!(result, Err(MapSyncError::LookupFailure { .. })));
    }

    #[tokio::test]
    async fn test_unknown_target_is_a_lookup_failure() {
        let (resolver, _) = resolver(TreeInventory::default());
        let result = resolver.resolve(&DeviceId::from("missing")).await;
        assert!(matches!(result, Err(MapSyncError::LookupFailure { .. })));
    }
}
