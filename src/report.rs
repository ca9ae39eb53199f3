//! Team reports
//!
//! Turns counts and member lists into the plain-text replies the commands
//! send. Discord rejects messages over [`MESSAGE_LIMIT`] characters, so long
//! rosters are split into several messages.

use crate::team::{MemberRef, Team, TeamPair, TeamSlot};

/// Width of the stats bar in blocks
pub const BAR_WIDTH: u32 = 20;

/// Maximum characters per Discord message
pub const MESSAGE_LIMIT: usize = 2000;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Live member counts of both teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamStats {
    pub count_a: u64,
    pub count_b: u64,
}

/// Which team is ahead, and by how much
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Tie,
    Ahead { slot: TeamSlot, by: u64 },
}

impl TeamStats {
    pub fn new(count_a: u64, count_b: u64) -> Self {
        Self { count_a, count_b }
    }

    pub fn count(&self, slot: TeamSlot) -> u64 {
        match slot {
            TeamSlot::A => self.count_a,
            TeamSlot::B => self.count_b,
        }
    }

    pub fn total(&self) -> u64 {
        self.count_a + self.count_b
    }

    /// Blocks for team A and team B in a bar `width` wide
    ///
    /// Team A gets `round(width * a / total)`; an empty guild splits evenly.
    pub fn bar_split(&self, width: u32) -> (u32, u32) {
        let total = self.total();
        let filled = if total == 0 {
            width / 2
        } else {
            (f64::from(width) * self.count_a as f64 / total as f64).round() as u32
        };
        (filled, width - filled)
    }

    pub fn standing(&self) -> Standing {
        use std::cmp::Ordering;

        match self.count_a.cmp(&self.count_b) {
            Ordering::Equal => Standing::Tie,
            Ordering::Greater => Standing::Ahead {
                slot: TeamSlot::A,
                by: self.count_a - self.count_b,
            },
            Ordering::Less => Standing::Ahead {
                slot: TeamSlot::B,
                by: self.count_b - self.count_a,
            },
        }
    }
}

/// Outcome of an assign-all run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub added_a: u64,
    pub added_b: u64,
    /// Counts re-read after the last assignment
    pub totals: TeamStats,
}

impl BatchSummary {
    pub fn assigned(&self) -> u64 {
        self.added_a + self.added_b
    }

    pub fn added(&self, slot: TeamSlot) -> u64 {
        match slot {
            TeamSlot::A => self.added_a,
            TeamSlot::B => self.added_b,
        }
    }

    pub(crate) fn record(&mut self, slot: TeamSlot) {
        match slot {
            TeamSlot::A => self.added_a += 1,
            TeamSlot::B => self.added_b += 1,
        }
    }
}

/// The proportional bar, framed by the two team emojis
pub fn render_bar(teams: &TeamPair, stats: &TeamStats) -> String {
    let (filled, empty) = stats.bar_split(BAR_WIDTH);
    format!(
        "{} {}{} {}",
        teams.get(TeamSlot::A).emoji,
        FILLED.to_string().repeat(filled as usize),
        EMPTY.to_string().repeat(empty as usize),
        teams.get(TeamSlot::B).emoji,
    )
}

pub fn render_standing(teams: &TeamPair, stats: &TeamStats) -> String {
    match stats.standing() {
        Standing::Tie => "⚖️ **Égalité parfaite !**".to_string(),
        Standing::Ahead { slot, by } => {
            let team = teams.get(slot);
            format!("{} **{} en avance** de {by} membre(s)", team.emoji, team.name)
        }
    }
}

pub fn render_stats(teams: &TeamPair, stats: &TeamStats) -> String {
    let mut out = String::from("📊 **Statistiques des équipes**\n━━━━━━━━━━━━━━━━━━━━━━\n");
    for team in teams.iter() {
        out.push_str(&format!(
            "{} **{}** : {} membre(s)\n",
            team.emoji,
            team.name,
            stats.count(team.slot)
        ));
    }
    out.push_str(&format!("👥 **Total** : {} membre(s)\n\n", stats.total()));
    out.push_str(&render_bar(teams, stats));
    out.push_str("\n\n");
    out.push_str(&render_standing(teams, stats));
    out
}

/// Roster of one team, split into messages that each fit the limit
pub fn render_roster(team: &Team, members: &[MemberRef]) -> Vec<String> {
    if members.is_empty() {
        return vec![format!(
            "{} L'équipe **{}** est vide pour l'instant.",
            team.emoji, team.name
        )];
    }

    let header = format!(
        "{} **Équipe {}** — {} membre(s) :",
        team.emoji,
        team.name,
        members.len()
    );
    let lines: Vec<String> = members
        .iter()
        .map(|member| format!("• {}", member.display_name))
        .collect();

    let single = format!("{header}\n\n{}", lines.join("\n"));
    if single.chars().count() <= MESSAGE_LIMIT {
        return vec![single];
    }

    let mut messages = vec![header];
    messages.extend(chunk_lines(&lines, MESSAGE_LIMIT));
    messages
}

/// Pack lines into messages of at most `limit` characters, breaking only
/// between lines. A single line longer than `limit` gets its own message.
pub fn chunk_lines(lines: &[String], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in lines {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { current_len + 1 + line_len };

        if needed > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn render_batch(teams: &TeamPair, summary: &BatchSummary) -> String {
    if summary.assigned() == 0 {
        return "✅ Tous les membres ont déjà un rôle d'équipe !".to_string();
    }

    let mut out = format!("✅ **{} membres assignés !**", summary.assigned());
    for team in teams.iter() {
        out.push_str(&format!(
            "\n{} {} : +{} → **{} total**",
            team.emoji,
            team.name,
            summary.added(team.slot),
            summary.totals.count(team.slot)
        ));
    }
    out
}

pub fn render_reset(teams: &TeamPair, reset: usize) -> String {
    if reset == 0 {
        return "✅ Aucun membre n'a de rôle d'équipe !".to_string();
    }
    format!(
        "✅ **{reset} membres réinitialisés !** Les rôles {} et {} ont été retirés.",
        teams.get(TeamSlot::A).name,
        teams.get(TeamSlot::B).name
    )
}

/// Direct message sent to a member after assignment
pub fn render_welcome(team: &Team) -> String {
    format!(
        "{} Bienvenue ! Tu as rejoint l'équipe **{}**.",
        team.emoji, team.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use twilight_model::id::Id;

    fn teams() -> TeamPair {
        TeamPair::new(
            Team::new(TeamSlot::A, Id::new(1), "Papillons", "🦋"),
            Team::new(TeamSlot::B, Id::new(2), "Dragons", "🐉"),
        )
    }

    #[test]
    fn empty_guild_splits_bar_in_half() {
        assert_eq!(TeamStats::new(0, 0).bar_split(BAR_WIDTH), (10, 10));
        assert_eq!(TeamStats::new(0, 0).bar_split(7), (3, 4));
    }

    #[test]
    fn bar_is_proportional_and_rounded() {
        assert_eq!(TeamStats::new(1, 1).bar_split(20), (10, 10));
        assert_eq!(TeamStats::new(3, 1).bar_split(20), (15, 5));
        assert_eq!(TeamStats::new(0, 5).bar_split(20), (0, 20));
        assert_eq!(TeamStats::new(5, 0).bar_split(20), (20, 0));
        // 20 * 1/3 = 6.67
        assert_eq!(TeamStats::new(1, 2).bar_split(20), (7, 13));
        // 20 * 1/8 = 2.5 rounds up
        assert_eq!(TeamStats::new(1, 7).bar_split(20), (3, 17));
    }

    #[test]
    fn bar_always_has_full_width() {
        for a in 0..30 {
            for b in 0..30 {
                let (filled, empty) = TeamStats::new(a, b).bar_split(BAR_WIDTH);
                assert_eq!(filled + empty, BAR_WIDTH);
            }
        }
    }

    #[test]
    fn standing_reports_exact_lead() {
        assert_eq!(TeamStats::new(2, 2).standing(), Standing::Tie);
        assert_eq!(
            TeamStats::new(7, 4).standing(),
            Standing::Ahead { slot: TeamSlot::A, by: 3 }
        );
        assert_eq!(
            TeamStats::new(0, 1).standing(),
            Standing::Ahead { slot: TeamSlot::B, by: 1 }
        );
    }

    #[test]
    fn stats_message_contains_counts_bar_and_status() {
        let text = render_stats(&teams(), &TeamStats::new(3, 1));
        assert!(text.contains("**Papillons** : 3 membre(s)"));
        assert!(text.contains("**Dragons** : 1 membre(s)"));
        assert!(text.contains("**Total** : 4 membre(s)"));
        assert!(text.contains(&format!("🦋 {}{} 🐉", "█".repeat(15), "░".repeat(5))));
        assert!(text.ends_with("🦋 **Papillons en avance** de 2 membre(s)"));
    }

    #[test]
    fn empty_stats_message_reports_tie() {
        let text = render_stats(&teams(), &TeamStats::default());
        assert!(text.contains(&format!("{}{}", "█".repeat(10), "░".repeat(10))));
        assert!(text.ends_with("Égalité parfaite !**"));
    }

    #[test]
    fn empty_roster_has_dedicated_message() {
        let messages = render_roster(teams().get(TeamSlot::B), &[]);
        assert_eq!(messages, vec!["🐉 L'équipe **Dragons** est vide pour l'instant.".to_string()]);
    }

    #[test]
    fn short_roster_fits_one_message() {
        let members = vec![
            MemberRef::new(Id::new(5), "alice"),
            MemberRef::new(Id::new(6), "bob"),
        ];
        let messages = render_roster(teams().get(TeamSlot::A), &members);
        assert_eq!(
            messages,
            vec!["🦋 **Équipe Papillons** — 2 membre(s) :\n\n• alice\n• bob".to_string()]
        );
    }

    #[test]
    fn long_roster_is_split_under_the_limit() {
        let members: Vec<_> = (1..=300)
            .map(|n| MemberRef::new(Id::new(n), format!("member-with-a-long-name-{n:04}")))
            .collect();
        let messages = render_roster(teams().get(TeamSlot::A), &members);

        assert!(messages.len() > 2);
        assert_eq!(messages[0], "🦋 **Équipe Papillons** — 300 membre(s) :");
        for message in &messages {
            assert!(message.chars().count() <= MESSAGE_LIMIT);
        }

        let listed: Vec<&str> = messages[1..].iter().flat_map(|m| m.lines()).collect();
        assert_eq!(listed.len(), 300);
        assert_eq!(listed[0], "• member-with-a-long-name-0001");
        assert_eq!(listed[299], "• member-with-a-long-name-0300");
    }

    #[test]
    fn chunking_breaks_only_between_lines() {
        let lines: Vec<String> = ["aaaa", "bbbb", "cccc"].iter().map(|s| s.to_string()).collect();
        assert_eq!(chunk_lines(&lines, 9), vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(chunk_lines(&lines, 3), vec!["aaaa", "bbbb", "cccc"]);
        assert!(chunk_lines(&[], 10).is_empty());
    }

    #[test]
    fn batch_message_reports_gains_and_totals() {
        let summary = BatchSummary {
            added_a: 3,
            added_b: 2,
            totals: TeamStats::new(8, 8),
        };
        let text = render_batch(&teams(), &summary);
        assert!(text.starts_with("✅ **5 membres assignés !**"));
        assert!(text.contains("🦋 Papillons : +3 → **8 total**"));
        assert!(text.contains("🐉 Dragons : +2 → **8 total**"));
    }

    #[test]
    fn empty_batch_and_reset_have_no_op_messages() {
        assert_eq!(
            render_batch(&teams(), &BatchSummary::default()),
            "✅ Tous les membres ont déjà un rôle d'équipe !"
        );
        assert_eq!(render_reset(&teams(), 0), "✅ Aucun membre n'a de rôle d'équipe !");
        assert!(render_reset(&teams(), 4).contains("**4 membres réinitialisés !**"));
    }
}
