use crate::core::classifier::GroupKey;
use crate::core::profile::ImageProfile;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Classified images, each group ordered by dominant color.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedGroups {
    pub groups: BTreeMap<GroupKey, Vec<ImageProfile>>,
    /// Keys no image landed in, in output order
    pub empty: Vec<GroupKey>,
}

impl SortedGroups {
    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn path_lists(&self) -> BTreeMap<GroupKey, Vec<PathBuf>> {
        self.groups
            .iter()
            .map(|(key, profiles)| {
                let paths = profiles.iter().map(|p| p.path.clone()).collect();
                (*key, paths)
            })
            .collect()
    }
}

/// Bucket classified profiles by key and order each bucket by ascending
/// dominant color. The sort is stable, so equal colors keep input order.
pub fn sort_groups(classified: Vec<(GroupKey, ImageProfile)>) -> SortedGroups {
    let mut groups: BTreeMap<GroupKey, Vec<ImageProfile>> = BTreeMap::new();
    for (key, profile) in classified {
        groups.entry(key).or_default().push(profile);
    }

    for profiles in groups.values_mut() {
        profiles.sort_by_key(|p| p.dominant_color);
    }

    let empty = GroupKey::all()
        .filter(|key| !groups.contains_key(key))
        .collect();

    SortedGroups { groups, empty }
}
