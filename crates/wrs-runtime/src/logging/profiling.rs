use core::{fmt::Display, time::Duration};
use hashbrown::HashMap;

/// Accumulated execution time per kernel name.
#[derive(Debug, Default)]
pub struct Profiled {
    durations: HashMap<String, ProfileItem>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ProfileItem {
    total_duration: Duration,
    num_computed: usize,
}

impl Profiled {
    /// If some dispatch was profiled.
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Registers one execution of the named kernel.
    pub fn update(&mut self, name: &str, duration: Duration) {
        if let Some(item) = self.durations.get_mut(name) {
            item.total_duration += duration;
            item.num_computed += 1;
        } else {
            self.durations.insert(
                name.to_string(),
                ProfileItem {
                    total_duration: duration,
                    num_computed: 1,
                },
            );
        }
    }

    /// Number of executions registered for the named kernel.
    pub fn num_computed(&self, name: &str) -> usize {
        self.durations
            .get(name)
            .map(|item| item.num_computed)
            .unwrap_or(0)
    }
}

impl Display for Profiled {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut items: Vec<(&String, &ProfileItem)> = self.durations.iter().collect();
        items.sort_by(|(_, a), (_, b)| b.total_duration.cmp(&a.total_duration));

        let total: Duration = items.iter().map(|(_, item)| item.total_duration).sum();
        let name_len = items
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Name".len());

        writeln!(
            f,
            "| {:<name_len$} | {:<14} | {:<12} | {:<7} |",
            "Name", "Duration", "Num Computed", "Ratio"
        )?;

        for (name, item) in items {
            let ratio = match total.as_micros() {
                0 => 0,
                total => 100 * item.total_duration.as_micros() / total,
            };
            writeln!(
                f,
                "| {:<name_len$} | {:<14} | {:<12} | {:<7} |",
                name,
                format!("{:?}", item.total_duration),
                item.num_computed,
                format!("{ratio} %"),
            )?;
        }

        write!(
            f,
            "| {:<name_len$} | {:<14} | {:<12} | {:<7} |",
            "Total",
            format!("{total:?}"),
            "",
            "100 %"
        )
    }
}
