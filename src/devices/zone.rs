// MIT License - Copyright (c) 2026 Peter Wright
// Zones and zone groups

use std::fmt;

/// Physical state of a zone as mirrored by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneState {
    Open,
    Closed,
    /// Zone caused an alarm. Held until the partition is disarmed.
    Tripped,
}

impl ZoneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Tripped => "tripped",
        }
    }
}

impl fmt::Display for ZoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate state of a zone group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneGroupState {
    /// At least one member is open and none is tripped.
    ZoneOpen,
    AllClosed,
    /// At least one member is tripped.
    ZoneTripped,
}

impl ZoneGroupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZoneOpen => "zoneOpen",
            Self::AllClosed => "allZonesClosed",
            Self::ZoneTripped => "zoneTripped",
        }
    }
}

impl fmt::Display for ZoneGroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alarm zone.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: u16,
    /// `None` until the panel reports the zone for the first time.
    pub state: Option<ZoneState>,
    pub minutes_since_change: u32,
}

impl Zone {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            state: None,
            minutes_since_change: 0,
        }
    }

    /// Apply a new state. Returns `true` if it differs from the current one,
    /// in which case the change counter restarts.
    pub fn set_state(&mut self, state: ZoneState) -> bool {
        if self.state == Some(state) {
            return false;
        }
        self.state = Some(state);
        self.minutes_since_change = 0;
        true
    }

    /// Advance the change counter by one minute and return it.
    pub fn tick_minute(&mut self) -> u32 {
        self.minutes_since_change = self.minutes_since_change.saturating_add(1);
        self.minutes_since_change
    }

    pub fn is_open(&self) -> bool {
        self.state == Some(ZoneState::Open)
    }
}

/// A configured set of zones reported as one unit.
#[derive(Debug, Clone)]
pub struct ZoneGroup {
    pub id: u32,
    pub name: String,
    pub zones: Vec<u16>,
    pub state: Option<ZoneGroupState>,
    /// Minutes since any member changed state.
    pub any_member_minutes: u32,
    /// Minutes since the aggregate group state changed.
    pub entire_group_minutes: u32,
}

impl ZoneGroup {
    pub fn new(id: u32, name: impl Into<String>, zones: Vec<u16>) -> Self {
        Self {
            id,
            name: name.into(),
            zones,
            state: None,
            any_member_minutes: 0,
            entire_group_minutes: 0,
        }
    }

    pub fn contains(&self, zone: u16) -> bool {
        self.zones.contains(&zone)
    }

    /// Compute the aggregate state from member states. Unknown members count
    /// as closed.
    pub fn evaluate<F>(&self, lookup: F) -> ZoneGroupState
    where
        F: Fn(u16) -> Option<ZoneState>,
    {
        let mut state = ZoneGroupState::AllClosed;
        for &zone in &self.zones {
            match lookup(zone) {
                Some(ZoneState::Tripped) => return ZoneGroupState::ZoneTripped,
                Some(ZoneState::Open) => state = ZoneGroupState::ZoneOpen,
                _ => {}
            }
        }
        state
    }

    /// Record that a member changed to produce `new_state`. Restarts the
    /// member counter, and the group counter as well when the aggregate state
    /// changed. Returns `true` in that case.
    pub fn member_changed(&mut self, new_state: ZoneGroupState) -> bool {
        self.any_member_minutes = 0;
        if self.state == Some(new_state) {
            return false;
        }
        self.state = Some(new_state);
        self.entire_group_minutes = 0;
        true
    }

    pub fn tick_minute(&mut self) {
        self.any_member_minutes = self.any_member_minutes.saturating_add(1);
        self.entire_group_minutes = self.entire_group_minutes.saturating_add(1);
    }

    pub fn reset_timers(&mut self) {
        self.any_member_minutes = 0;
        self.entire_group_minutes = 0;
    }
}

/// Compact age label: `5m`, `3h`, `2d`. Empty beyond 30 days.
pub fn short_duration(minutes: u32) -> String {
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 1440 {
        format!("{}h", minutes / 60)
    } else if minutes < 43200 {
        format!("{}d", minutes / 1440)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_zone_set_state() {
        let mut zone = Zone::new(3);
        assert!(zone.set_state(ZoneState::Open));
        assert!(zone.is_open());
        assert!(!zone.set_state(ZoneState::Open));

        zone.tick_minute();
        zone.tick_minute();
        assert_eq!(zone.minutes_since_change, 2);
        assert!(zone.set_state(ZoneState::Closed));
        assert_eq!(zone.minutes_since_change, 0);
    }

    #[test]
    fn test_group_evaluate() {
        let group = ZoneGroup::new(1, "Downstairs", vec![1, 2, 3]);
        let mut states = HashMap::new();
        assert_eq!(group.evaluate(|z| states.get(&z).copied()), ZoneGroupState::AllClosed);

        states.insert(2, ZoneState::Open);
        assert_eq!(group.evaluate(|z| states.get(&z).copied()), ZoneGroupState::ZoneOpen);

        states.insert(1, ZoneState::Tripped);
        assert_eq!(group.evaluate(|z| states.get(&z).copied()), ZoneGroupState::ZoneTripped);

        // Non-members never count.
        let mut others = HashMap::new();
        others.insert(9, ZoneState::Tripped);
        assert_eq!(group.evaluate(|z| others.get(&z).copied()), ZoneGroupState::AllClosed);
    }

    #[test]
    fn test_group_timers() {
        let mut group = ZoneGroup::new(1, "Garage", vec![7]);
        assert!(group.member_changed(ZoneGroupState::ZoneOpen));
        group.tick_minute();
        group.tick_minute();
        assert!(!group.member_changed(ZoneGroupState::ZoneOpen));
        assert_eq!(group.any_member_minutes, 0);
        assert_eq!(group.entire_group_minutes, 2);

        group.tick_minute();
        group.reset_timers();
        assert_eq!((group.any_member_minutes, group.entire_group_minutes), (0, 0));
    }

    #[test]
    fn test_short_duration() {
        assert_eq!(short_duration(0), "0m");
        assert_eq!(short_duration(59), "59m");
        assert_eq!(short_duration(60), "1h");
        assert_eq!(short_duration(1439), "23h");
        assert_eq!(short_duration(1440), "1d");
        assert_eq!(short_duration(43199), "29d");
        assert_eq!(short_duration(43200), "");
    }
}
