//! Per-maneuver dataset balancing
//!
//! Caps every category at `category_cap` frames and, while a turn window is
//! open, relabels lane-follow frames into the turn category so that
//! straight-road driving does not dominate the dataset.
//!
//! Redirect windows: each genuine left/right/straight frame bumps that
//! category's redirect counter. A lane-follow frame is relabeled into the
//! first of left, right, straight whose counter is in `1..=redirect_quota`
//! and which is still under cap. When no window qualifies, all three
//! redirect counters reset to zero; a new window opens only when another
//! genuine turn frame arrives.

use drive_protocol::NavigationCommand;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Balancing limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Maximum frames kept per category
    pub category_cap: u32,
    /// Lane-follow frames relabeled into a turn category per window
    pub redirect_quota: u32,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            category_cap: 10_000,
            redirect_quota: 100,
        }
    }
}

/// Capacity state of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryStatus {
    #[default]
    UnderCap,
    AtCap,
}

/// Balancer decision for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Persist under this category (may differ from the raw command)
    Accept(NavigationCommand),
    /// Category exhausted, drop the frame
    Reject,
    /// Every driving category is full; the session is over
    Complete,
}

#[derive(Debug, Clone, Copy, Default)]
struct CategoryCounter {
    count: u32,
    status: CategoryStatus,
    /// Redirect window counter, only used by turn categories
    redirect: u32,
}

#[derive(Debug, Clone, Default)]
struct Counters {
    left: CategoryCounter,
    right: CategoryCounter,
    straight: CategoryCounter,
    lanefollow: CategoryCounter,
    void: CategoryCounter,
}

impl Counters {
    fn get(&self, category: NavigationCommand) -> &CategoryCounter {
        match category {
            NavigationCommand::Left => &self.left,
            NavigationCommand::Right => &self.right,
            NavigationCommand::Straight => &self.straight,
            NavigationCommand::LaneFollow => &self.lanefollow,
            NavigationCommand::Void => &self.void,
        }
    }

    fn get_mut(&mut self, category: NavigationCommand) -> &mut CategoryCounter {
        match category {
            NavigationCommand::Left => &mut self.left,
            NavigationCommand::Right => &mut self.right,
            NavigationCommand::Straight => &mut self.straight,
            NavigationCommand::LaneFollow => &mut self.lanefollow,
            NavigationCommand::Void => &mut self.void,
        }
    }
}

const TURNS: [NavigationCommand; 3] = [
    NavigationCommand::Left,
    NavigationCommand::Right,
    NavigationCommand::Straight,
];

const DRIVING: [NavigationCommand; 4] = [
    NavigationCommand::Left,
    NavigationCommand::Right,
    NavigationCommand::Straight,
    NavigationCommand::LaneFollow,
];

/// In-memory balancing state for one recording session.
///
/// Counters only grow within a session and are never persisted.
#[derive(Debug, Clone)]
pub struct DatasetBalancer {
    config: BalancerConfig,
    counters: Counters,
}

impl DatasetBalancer {
    pub fn new(config: BalancerConfig) -> Self {
        info!(
            "Creating dataset balancer: cap={} redirect_quota={}",
            config.category_cap, config.redirect_quota
        );
        Self {
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Frames accepted into `category`
    pub fn count(&self, category: NavigationCommand) -> u32 {
        self.counters.get(category).count
    }

    pub fn status(&self, category: NavigationCommand) -> CategoryStatus {
        self.counters.get(category).status
    }

    /// Current redirect window counter (0 for lane-follow and void)
    pub fn redirect_count(&self, category: NavigationCommand) -> u32 {
        self.counters.get(category).redirect
    }

    /// All four driving categories have reached the cap
    pub fn is_complete(&self) -> bool {
        DRIVING
            .iter()
            .all(|&category| self.count(category) >= self.config.category_cap)
    }

    /// Decide what to do with a frame captured under `command`
    pub fn admit(&mut self, command: NavigationCommand) -> Admission {
        if self.is_complete() {
            return Admission::Complete;
        }

        match command {
            NavigationCommand::Left | NavigationCommand::Right | NavigationCommand::Straight => {
                if !self.reserve(command) {
                    return Admission::Reject;
                }
                self.counters.get_mut(command).redirect += 1;
                Admission::Accept(command)
            }
            NavigationCommand::LaneFollow => self.admit_lanefollow(),
            NavigationCommand::Void => {
                if self.reserve(command) {
                    Admission::Accept(command)
                } else {
                    Admission::Reject
                }
            }
        }
    }

    fn admit_lanefollow(&mut self) -> Admission {
        let at_cap = self.count(NavigationCommand::LaneFollow) >= self.config.category_cap;
        if at_cap {
            self.mark_finished(NavigationCommand::LaneFollow);
        }

        if let Some(target) = self.redirect_target() {
            let counter = self.counters.get_mut(target);
            counter.count += 1;
            counter.redirect += 1;
            debug!("Relabeled lanefollow frame as {}", target);
            return Admission::Accept(target);
        }

        for turn in TURNS {
            self.counters.get_mut(turn).redirect = 0;
        }

        if at_cap {
            Admission::Reject
        } else {
            self.counters.get_mut(NavigationCommand::LaneFollow).count += 1;
            Admission::Accept(NavigationCommand::LaneFollow)
        }
    }

    fn redirect_target(&self) -> Option<NavigationCommand> {
        TURNS.into_iter().find(|&turn| {
            let counter = self.counters.get(turn);
            counter.redirect > 0
                && counter.redirect <= self.config.redirect_quota
                && counter.count < self.config.category_cap
        })
    }

    /// Count one frame into `category` if it has room
    fn reserve(&mut self, category: NavigationCommand) -> bool {
        if self.count(category) >= self.config.category_cap {
            self.mark_finished(category);
            return false;
        }
        self.counters.get_mut(category).count += 1;
        true
    }

    fn mark_finished(&mut self, category: NavigationCommand) {
        let counter = self.counters.get_mut(category);
        if counter.status == CategoryStatus::UnderCap {
            counter.status = CategoryStatus::AtCap;
            info!("{} finished ({} frames)", category, counter.count);
        }
    }
}

impl Default for DatasetBalancer {
    fn default() -> Self {
        Self::new(BalancerConfig::default())
    }
}
