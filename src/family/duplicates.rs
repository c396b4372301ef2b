use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::person::Person;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    SameName,
    SameNameAndDates,
}

#[derive(Debug, Serialize)]
pub struct DuplicateGroup<'a> {
    pub label: String,
    pub reason: DuplicateReason,
    pub members: Vec<&'a Person>,
}

/// Case-insensitive, trimmed "first last".
pub fn name_key(person: &Person) -> String {
    format!("{} {}", person.first_name.trim(), person.last_name.trim()).to_lowercase()
}

fn date_str(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Report likely duplicate records: members sharing a name, and members sharing
/// a name plus both dates. A same-dates group identical to a reported same-name
/// group is not reported again.
///
/// A same-dates group that is a strict subset of a same-name group is still
/// reported, so its members appear under both reasons. Every same-dates group
/// sits inside some same-name group, and dropping covered groups would leave
/// only name matches.
pub fn find_duplicates(members: &[Person]) -> Vec<DuplicateGroup<'_>> {
    let by_name = group_by(members, |p| {
        let key = name_key(p);
        (!key.trim().is_empty()).then_some(key)
    });
    let by_dates = group_by(members, |p| {
        let key = name_key(p);
        (!key.trim().is_empty()).then(|| {
            format!("{key}|{}|{}", date_str(p.date_of_birth), date_str(p.date_of_death))
        })
    });

    let mut groups = Vec::new();
    let mut reported: Vec<Vec<usize>> = Vec::new();

    for (key, positions) in by_name {
        if positions.len() < 2 {
            continue;
        }
        groups.push(DuplicateGroup {
            label: key,
            reason: DuplicateReason::SameName,
            members: positions.iter().map(|&pos| &members[pos]).collect(),
        });
        reported.push(positions);
    }

    for (_, positions) in by_dates {
        if positions.len() < 2 || reported.contains(&positions) {
            continue;
        }
        let first = &members[positions[0]];
        let born = date_str(first.date_of_birth);
        let died = date_str(first.date_of_death);
        groups.push(DuplicateGroup {
            label: format!(
                "{} (born {}, died {})",
                name_key(first),
                if born.is_empty() { "unknown" } else { born.as_str() },
                if died.is_empty() { "unknown" } else { died.as_str() },
            ),
            reason: DuplicateReason::SameNameAndDates,
            members: positions.iter().map(|&pos| &members[pos]).collect(),
        });
    }

    groups
}

/// Group member positions by key, keeping first-appearance order of keys.
fn group_by<F>(members: &[Person], key_of: F) -> Vec<(String, Vec<usize>)>
where
    F: Fn(&Person) -> Option<String>,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (pos, member) in members.iter().enumerate() {
        let Some(key) = key_of(member) else {
            continue;
        };
        match slots.get(&key) {
            Some(&slot) => groups[slot].1.push(pos),
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push((key, vec![pos]));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::person::fixtures::person;

    #[test]
    fn test_case_insensitive_name_duplicates() {
        let members = vec![
            person(1, "Jane", "Doe"),
            person(2, "jane", "DOE"),
            person(3, "John", "Smith"),
        ];
        let groups = find_duplicates(&members);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "jane doe");
        assert_eq!(groups[0].reason, DuplicateReason::SameName);
        assert_eq!(groups[0].members.len(), 2);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let members = vec![person(1, " Jane ", "Doe"), person(2, "Jane", " Doe")];
        assert_eq!(find_duplicates(&members).len(), 1);
    }

    #[test]
    fn test_same_pair_not_reported_twice() {
        let mut a = person(1, "Jane", "Doe");
        let mut b = person(2, "Jane", "Doe");
        a.date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        b.date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        let members = vec![a, b];

        let groups = find_duplicates(&members);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].reason, DuplicateReason::SameName);
    }

    #[test]
    fn test_date_subgroup_reported_separately() {
        let mut a = person(1, "Jane", "Doe");
        let mut b = person(2, "Jane", "Doe");
        let mut c = person(3, "Jane", "Doe");
        a.date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        b.date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        c.date_of_birth = NaiveDate::from_ymd_opt(1988, 2, 3);
        let members = vec![a, b, c];

        let groups = find_duplicates(&members);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members.len(), 3);
        assert_eq!(groups[1].reason, DuplicateReason::SameNameAndDates);
        assert_eq!(groups[1].members.len(), 2);
        assert_eq!(groups[1].label, "jane doe (born 1950-05-01, died unknown)");
    }

    #[test]
    fn test_identical_groups_reported_once() {
        let mut members: Vec<Person> = (1..=4).map(|n| person(n, "Jane", "Doe")).collect();
        members[0].date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        members[1].date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        members[2].date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        members[3].date_of_birth = NaiveDate::from_ymd_opt(1950, 5, 1);
        members.push(person(5, "Ann", "Lee"));
        members.push(person(6, "Ann", "Lee"));

        let groups = find_duplicates(&members);
        let sets: Vec<Vec<Uuid>> = groups
            .iter()
            .map(|g| g.members.iter().map(|p| p.id).collect())
            .collect();

        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.reason == DuplicateReason::SameName));
        assert_ne!(sets[0], sets[1]);
    }

    #[test]
    fn test_no_duplicates() {
        let members = vec![person(1, "Jane", "Doe"), person(2, "John", "Doe")];
        assert!(find_duplicates(&members).is_empty());
    }
}
