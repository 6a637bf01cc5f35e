use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::constants::LOOKING_FOR_ALL;
use crate::models::Profile;

/// Member-selected discovery filters. Empty values are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileFilters {
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub looking_for: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ProfileFilters {
    fn location_needle(&self) -> Option<String> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_lowercase)
    }

    fn looking_for_active(&self) -> bool {
        match self.looking_for.first() {
            None => false,
            Some(first) => first != LOOKING_FOR_ALL,
        }
    }

    fn interest_needle(&self) -> Option<&str> {
        self.interest.as_deref().filter(|i| !i.is_empty())
    }
}

/// Apply location, looking-for and interest filters, then order real
/// members before demo profiles and newest first within each group.
pub fn filter_profiles(profiles: &[Profile], filters: &ProfileFilters) -> Vec<Profile> {
    let location = filters.location_needle();
    let looking_for_active = filters.looking_for_active();
    let interest = filters.interest_needle();

    let mut matched: Vec<Profile> = profiles
        .iter()
        .filter(|profile| match &location {
            Some(needle) => profile
                .location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(needle)),
            None => true,
        })
        .filter(|profile| {
            !looking_for_active
                || profile
                    .looking_for
                    .iter()
                    .any(|wanted| filters.looking_for.contains(wanted))
        })
        .filter(|profile| match interest {
            Some(interest) => profile.interests.iter().any(|i| i == interest),
            None => true,
        })
        .cloned()
        .collect();

    sort_profiles(&mut matched);
    matched
}

/// Stable sort: non-demo first, then `created_date` descending.
pub fn sort_profiles(profiles: &mut [Profile]) {
    profiles.sort_by_key(|profile| (profile.is_demo, Reverse(profile.created_date)));
}
