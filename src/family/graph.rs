use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::models::person::Person;

/// Sort key for members without a manual `display_order`.
pub const DEFAULT_DISPLAY_ORDER: i32 = 1000;

/// Expansion stops after this many generations, so cyclic data terminates.
pub const MAX_GENERATIONS: usize = 10;

/// Read-only relationship index over a snapshot of family members.
///
/// Every lookup tolerates dangling or asymmetric references: a missing id
/// simply resolves to nothing.
pub struct FamilyGraph<'a> {
    members: &'a [Person],
    index: HashMap<Uuid, usize>,
}

/// Generation placement: `levels[0]` are the roots, each following level the
/// children reached from the previous one. `unreached` holds members no root leads to.
#[derive(Debug)]
pub struct GenerationLayout<'a> {
    pub levels: Vec<Vec<&'a Person>>,
    pub unreached: Vec<&'a Person>,
}

impl<'a> GenerationLayout<'a> {
    /// Levels followed by the unreached members as a final group, when any.
    pub fn into_generations(self) -> Vec<Vec<&'a Person>> {
        let mut generations = self.levels;
        if !self.unreached.is_empty() {
            generations.push(self.unreached);
        }
        generations
    }
}

impl<'a> FamilyGraph<'a> {
    pub fn new(members: &'a [Person]) -> Self {
        let mut index = HashMap::with_capacity(members.len());
        for (pos, member) in members.iter().enumerate() {
            index.entry(member.id).or_insert(pos);
        }
        Self { members, index }
    }

    pub fn members(&self) -> &'a [Person] {
        self.members
    }

    pub fn get(&self, id: Uuid) -> Option<&'a Person> {
        self.index.get(&id).map(|&pos| &self.members[pos])
    }

    /// Members whose id appears in `person.parent_ids`. More than two are
    /// returned if the data says so.
    pub fn parents_of(&self, person: &Person) -> Vec<&'a Person> {
        self.members
            .iter()
            .filter(|m| person.parent_ids.contains(&m.id))
            .collect()
    }

    pub fn children_of(&self, person_id: Uuid) -> Vec<&'a Person> {
        self.members
            .iter()
            .filter(|m| m.parent_ids.contains(&person_id))
            .collect()
    }

    /// Other members sharing at least one parent id. No parents, no siblings.
    pub fn siblings_of(&self, person: &Person) -> Vec<&'a Person> {
        if person.parent_ids.is_empty() {
            return Vec::new();
        }
        self.members
            .iter()
            .filter(|m| m.id != person.id)
            .filter(|m| m.parent_ids.iter().any(|p| person.parent_ids.contains(p)))
            .collect()
    }

    pub fn spouse_of(&self, person: &Person) -> Option<&'a Person> {
        person
            .spouse_id
            .filter(|id| *id != person.id)
            .and_then(|id| self.get(id))
    }

    /// Members with no parents, except those who married into a lineage that
    /// is itself recorded (their spouse has parents).
    pub fn root_members(&self) -> Vec<&'a Person> {
        self.root_positions()
            .into_iter()
            .map(|pos| &self.members[pos])
            .collect()
    }

    pub fn build_generations(&self) -> Vec<Vec<&'a Person>> {
        self.layout().into_generations()
    }

    /// Single forward pass from the roots. A member is placed in the first
    /// generation that reaches it and never again; a spouse is placed right
    /// after their partner whatever their own ancestry.
    pub fn layout(&self) -> GenerationLayout<'a> {
        let mut placed = vec![false; self.members.len()];
        let mut levels: Vec<Vec<usize>> = Vec::new();

        let mut roots = self.root_positions();
        roots.sort_by_key(|&pos| {
            self.members[pos]
                .display_order
                .unwrap_or(DEFAULT_DISPLAY_ORDER)
        });
        for &pos in &roots {
            placed[pos] = true;
        }
        if !roots.is_empty() {
            levels.push(roots);
        }

        while levels.len() < MAX_GENERATIONS {
            let Some(previous) = levels.last() else {
                break;
            };

            let mut next = Vec::new();
            for &parent_pos in previous {
                let parent_id = self.members[parent_pos].id;
                let mut children: Vec<usize> = (0..self.members.len())
                    .filter(|&pos| !placed[pos] && self.members[pos].parent_ids.contains(&parent_id))
                    .collect();
                sort_siblings(&mut children, |a, b| compare_siblings(&self.members[a], &self.members[b]));

                for child in children {
                    // May already sit in this generation as a sibling's spouse.
                    if placed[child] {
                        continue;
                    }
                    placed[child] = true;
                    next.push(child);

                    if let Some(partner) = self.partner_position(child, &placed) {
                        placed[partner] = true;
                        next.push(partner);
                    }
                }
            }

            if next.is_empty() {
                break;
            }
            levels.push(next);
        }

        let unreached = (0..self.members.len())
            .filter(|&pos| !placed[pos])
            .map(|pos| &self.members[pos])
            .collect();

        GenerationLayout {
            levels: levels
                .into_iter()
                .map(|level| level.into_iter().map(|pos| &self.members[pos]).collect())
                .collect(),
            unreached,
        }
    }

    fn root_positions(&self) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.has_parents())
            .filter(|(_, m)| !self.spouse_of(m).is_some_and(|s| s.has_parents()))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// The unplaced member to seat beside `pos`: its recorded spouse, or when it
    /// records none, the first member that records it as their spouse.
    fn partner_position(&self, pos: usize, placed: &[bool]) -> Option<usize> {
        let person = &self.members[pos];
        match person.spouse_id {
            Some(spouse_id) => self
                .index
                .get(&spouse_id)
                .copied()
                .filter(|&spouse| spouse != pos && !placed[spouse]),
            None => (0..self.members.len()).find(|&other| {
                other != pos && !placed[other] && self.members[other].spouse_id == Some(person.id)
            }),
        }
    }
}

/// Siblings: manual order when both have one, then birth date (undated last),
/// then full name.
fn compare_siblings(a: &Person, b: &Person) -> Ordering {
    let by_order = match (a.display_order, b.display_order) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    };
    by_order
        .then_with(|| match (a.date_of_birth, b.date_of_birth) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.full_name().cmp(&b.full_name()))
}

/// Stable insertion sort. `compare_siblings` is not transitive once only some
/// siblings carry a display order, which `slice::sort_by` does not allow.
fn sort_siblings<F>(items: &mut [usize], mut compare: F)
where
    F: FnMut(usize, usize) -> Ordering,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(items[j - 1], items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::person::fixtures::{id, person};

    fn names(people: &[&Person]) -> Vec<String> {
        people.iter().map(|p| p.first_name.clone()).collect()
    }

    fn child_of(n: u128, first: &str, parents: &[u128]) -> Person {
        let mut p = person(n, first, "Doe");
        p.parent_ids = parents.iter().map(|&x| id(x)).collect();
        p
    }

    /// Grandparents (1, 2) with two children; child 3 married in-law 5 who has no parents.
    fn sample_family() -> Vec<Person> {
        let mut grandpa = person(1, "George", "Doe");
        grandpa.spouse_id = Some(id(2));
        let mut grandma = person(2, "Martha", "Doe");
        grandma.spouse_id = Some(id(1));

        let mut son = child_of(3, "John", &[1, 2]);
        son.spouse_id = Some(id(5));
        son.date_of_birth = NaiveDate::from_ymd_opt(1960, 1, 1);
        let mut daughter = child_of(4, "Anne", &[1, 2]);
        daughter.date_of_birth = NaiveDate::from_ymd_opt(1962, 1, 1);

        let mut in_law = person(5, "Carol", "Smith");
        in_law.spouse_id = Some(id(3));

        let grandchild = child_of(6, "Lucy", &[3, 5]);

        vec![grandpa, grandma, son, daughter, in_law, grandchild]
    }

    #[test]
    fn test_children_of_matches_any_position() {
        let family = sample_family();
        let graph = FamilyGraph::new(&family);

        assert_eq!(names(&graph.children_of(id(1))), vec!["John", "Anne"]);
        assert_eq!(names(&graph.children_of(id(2))), vec!["John", "Anne"]);
        assert_eq!(names(&graph.children_of(id(5))), vec!["Lucy"]);
        assert!(graph.children_of(id(6)).is_empty());
        assert!(graph.children_of(id(99)).is_empty());
    }

    #[test]
    fn test_parents_skip_dangling_ids() {
        let mut family = sample_family();
        family.push(child_of(7, "Orphan", &[42, 1]));
        let graph = FamilyGraph::new(&family);

        let orphan = graph.get(id(7)).unwrap();
        assert_eq!(names(&graph.parents_of(orphan)), vec!["George"]);
    }

    #[test]
    fn test_parents_of_tolerates_more_than_two() {
        let mut family = sample_family();
        family.push(child_of(7, "Odd", &[1, 2, 5]));
        let graph = FamilyGraph::new(&family);

        let odd = graph.get(id(7)).unwrap();
        assert_eq!(graph.parents_of(odd).len(), 3);
    }

    #[test]
    fn test_siblings_exclude_self_and_need_parents() {
        let family = sample_family();
        let graph = FamilyGraph::new(&family);

        let john = graph.get(id(3)).unwrap();
        assert_eq!(names(&graph.siblings_of(john)), vec!["Anne"]);

        let george = graph.get(id(1)).unwrap();
        assert!(graph.siblings_of(george).is_empty());
    }

    #[test]
    fn test_half_siblings_share_one_parent() {
        let mut family = sample_family();
        family.push(child_of(7, "Half", &[5]));
        let graph = FamilyGraph::new(&family);

        let lucy = graph.get(id(6)).unwrap();
        assert_eq!(names(&graph.siblings_of(lucy)), vec!["Half"]);
    }

    #[test]
    fn test_spouse_missing_reference_is_none() {
        let mut lonely = person(1, "Lonely", "Doe");
        lonely.spouse_id = Some(id(404));
        let family = vec![lonely];
        let graph = FamilyGraph::new(&family);

        assert!(graph.spouse_of(&family[0]).is_none());
    }

    #[test]
    fn test_roots_exclude_married_in() {
        let family = sample_family();
        let graph = FamilyGraph::new(&family);

        // Carol has no parents but married John, who does.
        assert_eq!(names(&graph.root_members()), vec!["George", "Martha"]);
    }

    #[test]
    fn test_root_then_spouse_with_parents_drops_out() {
        let mut family = sample_family();
        family.push(person(7, "Newcomer", "Roe"));
        {
            let graph = FamilyGraph::new(&family);
            assert!(graph.root_members().iter().any(|p| p.id == id(7)));
        }

        family[6].spouse_id = Some(id(4));
        let graph = FamilyGraph::new(&family);
        assert!(!graph.root_members().iter().any(|p| p.id == id(7)));
    }

    #[test]
    fn test_generations_place_spouse_beside_partner() {
        let family = sample_family();
        let graph = FamilyGraph::new(&family);
        let generations = graph.build_generations();

        assert_eq!(generations.len(), 3);
        assert_eq!(names(&generations[0]), vec!["George", "Martha"]);
        assert_eq!(names(&generations[1]), vec!["John", "Carol", "Anne"]);
        assert_eq!(names(&generations[2]), vec!["Lucy"]);
    }

    #[test]
    fn test_generations_place_everyone_once() {
        let mut family = sample_family();
        // Disconnected pair forming a parent cycle: neither is a root.
        family.push(child_of(7, "Loop", &[8]));
        family.push(child_of(8, "Pool", &[7]));
        let graph = FamilyGraph::new(&family);
        let generations = graph.build_generations();

        let total: usize = generations.iter().map(Vec::len).sum();
        assert_eq!(total, family.len());

        let mut seen: Vec<Uuid> = generations.iter().flatten().map(|p| p.id).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), family.len());

        assert_eq!(names(generations.last().unwrap()), vec!["Loop", "Pool"]);
    }

    #[test]
    fn test_roots_sorted_by_display_order() {
        let mut a = person(1, "A", "X");
        a.display_order = Some(1500);
        let b = person(2, "B", "X");
        let mut c = person(3, "C", "X");
        c.display_order = Some(200);
        let d = person(4, "D", "X");
        let family = vec![a, b, c, d];
        let graph = FamilyGraph::new(&family);

        // Unset counts as 1000; ties keep insertion order.
        assert_eq!(names(&graph.build_generations()[0]), vec!["C", "B", "D", "A"]);
    }

    #[test]
    fn test_children_sorted_by_birth_then_name() {
        let root = person(1, "Root", "X");
        let mut late = child_of(2, "Late", &[1]);
        late.date_of_birth = NaiveDate::from_ymd_opt(1990, 1, 1);
        let mut early = child_of(3, "Early", &[1]);
        early.date_of_birth = NaiveDate::from_ymd_opt(1980, 1, 1);
        let undated_b = child_of(4, "Bea", &[1]);
        let undated_a = child_of(5, "Abe", &[1]);

        let family = vec![root, late, early, undated_b, undated_a];
        let graph = FamilyGraph::new(&family);
        let generations = graph.build_generations();

        assert_eq!(names(&generations[1]), vec!["Early", "Late", "Abe", "Bea"]);
    }

    #[test]
    fn test_display_order_applies_only_when_both_siblings_have_one() {
        let root = person(1, "Root", "X");
        let mut early = child_of(2, "Early", &[1]);
        early.date_of_birth = NaiveDate::from_ymd_opt(1980, 1, 1);
        let mut pinned = child_of(3, "Pinned", &[1]);
        pinned.display_order = Some(1500);
        pinned.date_of_birth = NaiveDate::from_ymd_opt(1970, 1, 1);

        let family = vec![root, early, pinned];
        let graph = FamilyGraph::new(&family);

        // Early has no order, so birth date decides.
        assert_eq!(names(&graph.build_generations()[1]), vec!["Pinned", "Early"]);
    }

    #[test]
    fn test_display_order_beats_birth_date_when_both_set() {
        let root = person(1, "Root", "X");
        let mut older = child_of(2, "Older", &[1]);
        older.date_of_birth = NaiveDate::from_ymd_opt(1960, 1, 1);
        older.display_order = Some(900);
        let mut younger = child_of(3, "Younger", &[1]);
        younger.date_of_birth = NaiveDate::from_ymd_opt(1990, 1, 1);
        younger.display_order = Some(800);

        let family = vec![root, older, younger];
        let graph = FamilyGraph::new(&family);

        assert_eq!(names(&graph.build_generations()[1]), vec!["Younger", "Older"]);
    }

    #[test]
    fn test_mixed_orders_sort_without_panicking() {
        // Pairwise rules form a cycle: A < C by order, C < B and B < A by birth.
        let root = person(1, "Root", "X");
        let mut a = child_of(2, "A", &[1]);
        a.display_order = Some(1);
        a.date_of_birth = NaiveDate::from_ymd_opt(1990, 1, 1);
        let mut b = child_of(3, "B", &[1]);
        b.date_of_birth = NaiveDate::from_ymd_opt(1980, 1, 1);
        let mut c = child_of(4, "C", &[1]);
        c.display_order = Some(2);
        c.date_of_birth = NaiveDate::from_ymd_opt(1970, 1, 1);

        let family = vec![root, a, b, c];
        let graph = FamilyGraph::new(&family);
        let generations = graph.build_generations();

        assert_eq!(generations[1].len(), 3);
        assert_eq!(names(&generations[1]), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_first_reached_placement_wins() {
        // Dana descends from root A directly and from root B through C.
        let a = person(1, "A", "X");
        let b = person(2, "B", "X");
        let c = child_of(3, "C", &[2]);
        let dana = child_of(4, "Dana", &[1, 3]);
        let family = vec![a, b, c, dana];
        let graph = FamilyGraph::new(&family);
        let generations = graph.build_generations();

        assert_eq!(names(&generations[1]), vec!["Dana", "C"]);
        assert_eq!(generations.len(), 2);
    }

    #[test]
    fn test_asymmetric_spouse_still_adjacent() {
        let root = person(1, "Root", "X");
        let child = child_of(2, "Child", &[1]);
        let mut partner = person(3, "Partner", "Y");
        // Only the partner records the marriage.
        partner.spouse_id = Some(id(2));
        let family = vec![root, partner, child];
        let graph = FamilyGraph::new(&family);

        assert_eq!(names(&graph.root_members()), vec!["Root"]);
        let generations = graph.build_generations();
        assert_eq!(names(&generations[1]), vec!["Child", "Partner"]);
    }

    #[test]
    fn test_expansion_capped_at_max_generations() {
        let mut family = vec![person(0, "G0", "X")];
        for n in 1..12u128 {
            family.push(child_of(n, &format!("G{n}"), &[n - 1]));
        }
        let graph = FamilyGraph::new(&family);
        let layout = graph.layout();

        assert_eq!(layout.levels.len(), MAX_GENERATIONS);
        assert_eq!(names(&layout.unreached), vec!["G10", "G11"]);

        let generations = graph.build_generations();
        assert_eq!(generations.len(), MAX_GENERATIONS + 1);
        assert_eq!(generations.iter().map(Vec::len).sum::<usize>(), 12);
    }

    #[test]
    fn test_empty_input() {
        let family: Vec<Person> = Vec::new();
        let graph = FamilyGraph::new(&family);
        assert!(graph.root_members().is_empty());
        assert!(graph.build_generations().is_empty());
    }
}
