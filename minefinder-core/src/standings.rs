use minefinder_types::PlayerStatus;
use std::cmp::Ordering;

/// Outcome of a finished round: tied winners and everyone else, both in
/// room-member order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Standings {
    pub winners: Vec<String>,
    pub losers: Vec<String>,
}

impl Standings {
    pub fn is_winner(&self, username: &str) -> bool {
        self.winners.iter().any(|winner| winner == username)
    }
}

pub struct StandingsEngine;

impl StandingsEngine {
    /// Ranks members by fewest mines remaining, then shortest time.
    ///
    /// Members are visited in the order given. A strictly better member
    /// replaces the tied set, an equal one joins it. Members who never played
    /// the round cannot win.
    pub fn adjudicate<'a, I>(members: I) -> Standings
    where
        I: IntoIterator<Item = (&'a str, &'a PlayerStatus)>,
    {
        let mut best: Option<(i32, f64)> = None;
        let mut tied: Vec<&'a str> = Vec::new();
        let mut order: Vec<&'a str> = Vec::new();

        for (username, status) in members {
            order.push(username);
            if !status.played_round() {
                continue;
            }

            let key = (
                status.mines_remaining,
                status.elapsed_seconds.unwrap_or(f64::INFINITY),
            );
            match best.map(|current| Self::compare(key, current)) {
                None | Some(Ordering::Less) => {
                    best = Some(key);
                    tied.clear();
                    tied.push(username);
                }
                Some(Ordering::Equal) => tied.push(username),
                Some(Ordering::Greater) => {}
            }
        }

        let (winners, losers): (Vec<&str>, Vec<&str>) =
            order.into_iter().partition(|name| tied.contains(name));
        Standings {
            winners: winners.into_iter().map(str::to_string).collect(),
            losers: losers.into_iter().map(str::to_string).collect(),
        }
    }

    fn compare(a: (i32, f64), b: (i32, f64)) -> Ordering {
        a.0.cmp(&b.0).then_with(|| a.1.total_cmp(&b.1))
    }
}
