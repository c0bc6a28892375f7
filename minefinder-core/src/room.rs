use minefinder_types::{
    GameError, MinePlacement, Mode, OverallResult, PlayerStatus, RoomSummary,
};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::{Standings, StandingsEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub became_leader: bool,
    pub joined_mid_round: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub room_empty: bool,
    pub new_leader: Option<String>,
}

/// A named room and the race state of its members.
#[derive(Debug, Clone)]
pub struct Room {
    name: String,
    members: Vec<String>, // join order decides leader succession
    statuses: HashMap<String, PlayerStatus>,
    leader: Option<String>,
    game_started: bool,
    adjudicated: bool,
    mode: Mode,
    placement: Option<MinePlacement>,
    created_at: String,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            statuses: HashMap::new(),
            leader: None,
            game_started: false,
            adjudicated: false,
            mode: Mode::default(),
            placement: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn leader(&self) -> Option<&str> {
        self.leader.as_deref()
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn is_adjudicated(&self) -> bool {
        self.adjudicated
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn placement(&self) -> Option<&MinePlacement> {
        self.placement.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_member(&self, username: &str) -> bool {
        self.statuses.contains_key(username)
    }

    pub fn is_leader(&self, username: &str) -> bool {
        self.leader.as_deref() == Some(username)
    }

    pub fn status(&self, username: &str) -> Option<&PlayerStatus> {
        self.statuses.get(username)
    }

    /// A round is running and its standings are still open.
    pub fn round_in_progress(&self) -> bool {
        self.game_started && !self.adjudicated
    }

    pub fn all_finished(&self) -> bool {
        !self.members.is_empty() && self.statuses.values().all(|status| status.finished)
    }

    pub fn roster(&self) -> BTreeMap<String, PlayerStatus> {
        self.statuses
            .iter()
            .map(|(name, status)| (name.clone(), status.clone()))
            .collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            players: self.members.len() as u32,
            game_started: self.game_started,
            mode: self.mode,
            created_at: self.created_at.clone(),
        }
    }

    /// Adds a member. Joining a room twice changes nothing.
    pub fn join(&mut self, username: &str) -> JoinOutcome {
        if self.is_member(username) {
            return JoinOutcome {
                became_leader: false,
                joined_mid_round: false,
            };
        }

        let became_leader = self.leader.is_none();
        if became_leader {
            self.leader = Some(username.to_string());
        }

        let mut status = PlayerStatus::new(became_leader);
        // Sit out the running round; the next reset brings them in.
        let joined_mid_round = self.game_started;
        status.finished = joined_mid_round;

        self.members.push(username.to_string());
        self.statuses.insert(username.to_string(), status);

        JoinOutcome {
            became_leader,
            joined_mid_round,
        }
    }

    pub fn leave(&mut self, username: &str) -> Result<LeaveOutcome, GameError> {
        if self.statuses.remove(username).is_none() {
            return Err(self.not_in_room(username));
        }
        self.members.retain(|member| member != username);

        if self.members.is_empty() {
            self.leader = None;
            return Ok(LeaveOutcome {
                room_empty: true,
                new_leader: None,
            });
        }

        let mut new_leader = None;
        if self.is_leader(username) {
            let successor = self.members[0].clone();
            if let Some(status) = self.statuses.get_mut(&successor) {
                status.is_leader = true;
            }
            info!("{} is now leader of room {}", successor, self.name);
            self.leader = Some(successor.clone());
            new_leader = Some(successor);
        }

        Ok(LeaveOutcome {
            room_empty: false,
            new_leader,
        })
    }

    /// Starts the round with the leader's layout.
    pub fn start_round(&mut self, origin: &str, placement: MinePlacement) -> Result<(), GameError> {
        self.check_leader(origin)?;
        if self.game_started {
            return Err(GameError::RoundAlreadyStarted {
                room_name: self.name.clone(),
            });
        }

        let mine_count = placement.mines.len() as i32;
        for status in self.statuses.values_mut() {
            status.mines_remaining = mine_count;
        }
        self.placement = Some(placement);
        self.game_started = true;
        self.adjudicated = false;
        Ok(())
    }

    /// Clears every status except leadership and waits for a new layout.
    pub fn reset_round(&mut self, origin: &str, mode: Mode) -> Result<(), GameError> {
        self.check_leader(origin)?;

        for status in self.statuses.values_mut() {
            status.reset();
        }
        self.mode = mode;
        self.placement = None;
        self.game_started = false;
        self.adjudicated = false;
        Ok(())
    }

    pub fn record_flag(&mut self, username: &str, mines_remaining: i32) -> Result<(), GameError> {
        let status = self.active_status(username)?;
        status.mines_remaining = mines_remaining;
        Ok(())
    }

    /// Records a member's result. Returns whether every member has now
    /// finished.
    pub fn record_finish(
        &mut self,
        username: &str,
        won: bool,
        mines_remaining: i32,
        elapsed_seconds: f64,
    ) -> Result<bool, GameError> {
        if !elapsed_seconds.is_finite() || elapsed_seconds < 0.0 {
            return Err(GameError::InvalidElapsedTime);
        }

        let status = self.active_status(username)?;
        status.finished = true;
        status.won = Some(won);
        status.mines_remaining = mines_remaining;
        status.elapsed_seconds = Some(elapsed_seconds);

        Ok(self.all_finished())
    }

    /// Computes standings once, when the round is running and every member
    /// has finished.
    pub fn try_adjudicate(&mut self) -> Option<Standings> {
        if !self.round_in_progress() || !self.all_finished() {
            return None;
        }

        let standings = StandingsEngine::adjudicate(
            self.members
                .iter()
                .filter_map(|name| self.statuses.get(name).map(|status| (name.as_str(), status))),
        );

        for (name, status) in self.statuses.iter_mut() {
            status.overall_result = Some(if standings.is_winner(name) {
                OverallResult::Won
            } else {
                OverallResult::Lost
            });
        }
        self.adjudicated = true;

        info!(
            "Room {} standings: winners {:?}, losers {:?}",
            self.name, standings.winners, standings.losers
        );
        Some(standings)
    }

    fn active_status(&mut self, username: &str) -> Result<&mut PlayerStatus, GameError> {
        if !self.is_member(username) {
            return Err(self.not_in_room(username));
        }
        if !self.round_in_progress() {
            return Err(GameError::RoundNotInProgress {
                room_name: self.name.clone(),
            });
        }

        let status = self
            .statuses
            .get_mut(username)
            .ok_or_else(|| GameError::UserNotFound {
                username: username.to_string(),
            })?;
        if status.finished {
            return Err(GameError::AlreadyFinished {
                username: username.to_string(),
            });
        }
        Ok(status)
    }

    fn check_leader(&self, username: &str) -> Result<(), GameError> {
        if !self.is_member(username) {
            return Err(self.not_in_room(username));
        }
        if !self.is_leader(username) {
            return Err(GameError::NotRoomLeader {
                room_name: self.name.clone(),
                username: username.to_string(),
            });
        }
        Ok(())
    }

    fn not_in_room(&self, username: &str) -> GameError {
        GameError::NotInRoom {
            room_name: self.name.clone(),
            username: username.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minefinder_types::CellPos;

    fn placement(mines: usize) -> MinePlacement {
        MinePlacement {
            safe: CellPos::new(0, 0),
            mines: (1..=mines as u16).map(|x| CellPos::new(x, 0)).collect(),
        }
    }

    fn room_with(members: &[&str]) -> Room {
        let mut room = Room::new("r1");
        for member in members {
            room.join(member);
        }
        room
    }

    #[test]
    fn test_first_joiner_leads() {
        let mut room = Room::new("r1");

        let first = room.join("ann");
        let second = room.join("bob");

        assert!(first.became_leader);
        assert!(!second.became_leader);
        assert_eq!(room.leader(), Some("ann"));
        assert!(room.status("ann").unwrap().is_leader);
        assert!(!room.status("bob").unwrap().is_leader);
    }

    #[test]
    fn test_join_twice_is_noop() {
        let mut room = room_with(&["ann"]);
        room.join("ann");
        assert_eq!(room.members(), ["ann".to_string()]);
    }

    #[test]
    fn test_leader_succession_follows_join_order() {
        let mut room = room_with(&["ann", "bob", "cat"]);

        let outcome = room.leave("ann").unwrap();
        assert_eq!(outcome.new_leader.as_deref(), Some("bob"));
        assert!(room.status("bob").unwrap().is_leader);

        let outcome = room.leave("cat").unwrap();
        assert_eq!(outcome.new_leader, None);
        assert_eq!(room.leader(), Some("bob"));

        let outcome = room.leave("bob").unwrap();
        assert!(outcome.room_empty);
        assert!(room.is_empty());
        assert_eq!(room.leader(), None);
    }

    #[test]
    fn test_leave_unknown_member_fails() {
        let mut room = room_with(&["ann"]);
        assert!(matches!(room.leave("zed"), Err(GameError::NotInRoom { .. })));
    }

    #[test]
    fn test_mid_round_joiner_sits_out() {
        let mut room = room_with(&["ann"]);
        room.start_round("ann", placement(10)).unwrap();

        let outcome = room.join("bob");

        assert!(outcome.joined_mid_round);
        assert!(room.status("bob").unwrap().finished);
        assert!(matches!(
            room.record_flag("bob", 3),
            Err(GameError::AlreadyFinished { .. })
        ));
    }

    #[test]
    fn test_only_leader_starts_round() {
        let mut room = room_with(&["ann", "bob"]);

        assert!(matches!(
            room.start_round("bob", placement(10)),
            Err(GameError::NotRoomLeader { .. })
        ));
        room.start_round("ann", placement(10)).unwrap();
        assert!(room.game_started());
        assert_eq!(room.status("bob").unwrap().mines_remaining, 10);
        assert!(matches!(
            room.start_round("ann", placement(10)),
            Err(GameError::RoundAlreadyStarted { .. })
        ));
    }

    #[test]
    fn test_reset_preserves_leadership_only() {
        let mut room = room_with(&["ann", "bob"]);
        room.start_round("ann", placement(10)).unwrap();
        room.record_flag("bob", 8).unwrap();
        room.record_finish("ann", false, 7, 12.0).unwrap();

        room.reset_round("ann", Mode::Expert).unwrap();

        assert_eq!(room.status("ann").unwrap(), &PlayerStatus::new(true));
        assert_eq!(room.status("bob").unwrap(), &PlayerStatus::new(false));
        assert!(!room.game_started());
        assert_eq!(room.mode(), Mode::Expert);
        assert!(room.placement().is_none());
    }

    #[test]
    fn test_standings_wait_for_everyone() {
        let mut room = room_with(&["A", "B", "C"]);
        room.start_round("A", placement(10)).unwrap();

        assert!(!room.record_finish("A", true, 0, 50.0).unwrap());
        assert!(room.try_adjudicate().is_none());
        assert!(!room.record_finish("C", false, 2, 10.0).unwrap());
        assert!(room.record_finish("B", true, 0, 50.0).unwrap());

        let standings = room.try_adjudicate().unwrap();

        assert_eq!(standings.winners, vec!["A", "B"]);
        assert_eq!(room.status("A").unwrap().overall_result, Some(OverallResult::Won));
        assert_eq!(room.status("B").unwrap().overall_result, Some(OverallResult::Won));
        assert_eq!(room.status("C").unwrap().overall_result, Some(OverallResult::Lost));
        assert!(room.is_adjudicated());
        assert!(room.try_adjudicate().is_none());
    }

    #[test]
    fn test_stale_events_are_rejected() {
        let mut room = room_with(&["ann"]);

        assert!(matches!(
            room.record_flag("ann", 9),
            Err(GameError::RoundNotInProgress { .. })
        ));

        room.start_round("ann", placement(10)).unwrap();
        room.record_finish("ann", true, 0, 3.0).unwrap();
        room.try_adjudicate().unwrap();

        assert!(matches!(
            room.record_finish("ann", true, 0, 3.0),
            Err(GameError::RoundNotInProgress { .. })
        ));
        assert!(matches!(
            room.record_finish("zed", true, 0, 3.0),
            Err(GameError::NotInRoom { .. })
        ));
    }

    #[test]
    fn test_invalid_elapsed_time_is_rejected() {
        let mut room = room_with(&["ann"]);
        room.start_round("ann", placement(10)).unwrap();

        assert_eq!(
            room.record_finish("ann", true, 0, f64::NAN),
            Err(GameError::InvalidElapsedTime)
        );
        assert_eq!(
            room.record_finish("ann", true, 0, -1.0),
            Err(GameError::InvalidElapsedTime)
        );
        assert!(!room.status("ann").unwrap().finished);
    }
}
