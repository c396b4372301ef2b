use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use super::graph::GenerationLayout;
use crate::models::person::Person;

/// Levels below the second generation that the tree view nests:
/// children, grandchildren, great-grandchildren.
pub const NESTED_DEPTH: usize = 3;

/// A generation member and, when placed right after them, their spouse.
#[derive(Debug, Clone, Serialize)]
pub struct Couple<'a> {
    pub member: &'a Person,
    pub partner: Option<&'a Person>,
}

impl Couple<'_> {
    fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.member.id).chain(self.partner.map(|p| p.id))
    }

    fn is_parent_of(&self, child: &Person) -> bool {
        self.ids().any(|id| child.parent_ids.contains(&id))
    }
}

#[derive(Debug, Serialize)]
pub struct Branch<'a> {
    #[serde(flatten)]
    pub couple: Couple<'a>,
    pub children: Vec<Branch<'a>>,
}

/// What the family-tree page draws: the first two generations as rows, every
/// later generation nested under a second-generation couple.
#[derive(Debug, Serialize)]
pub struct TreeView<'a> {
    pub top: Vec<Couple<'a>>,
    pub branches: Vec<Branch<'a>>,
    /// Placed members the view cannot show (past the nesting depth).
    pub hidden_ids: Vec<Uuid>,
    pub unreached: Vec<&'a Person>,
}

/// Pair each member with the spouse placed directly after them.
pub fn couples<'a>(level: &[&'a Person]) -> Vec<Couple<'a>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < level.len() {
        let member = level[i];
        let partner = level.get(i + 1).copied().filter(|next| {
            next.spouse_id == Some(member.id) || member.spouse_id == Some(next.id)
        });
        i += if partner.is_some() { 2 } else { 1 };
        out.push(Couple { member, partner });
    }
    out
}

pub fn tree_view<'a>(layout: &GenerationLayout<'a>) -> TreeView<'a> {
    let levels: Vec<Vec<Couple<'a>>> = layout.levels.iter().map(|l| couples(l)).collect();
    let mut shown: HashSet<Uuid> = HashSet::new();

    let top = levels.first().cloned().unwrap_or_default();
    for couple in &top {
        shown.extend(couple.ids());
    }

    let mut branches = Vec::new();
    if let Some(second) = levels.get(1) {
        for couple in second {
            shown.extend(couple.ids());
            let children = nest(&levels, 2, couple, &mut shown);
            branches.push(Branch { couple: couple.clone(), children });
        }
    }

    let hidden_ids = layout
        .levels
        .iter()
        .flatten()
        .map(|p| p.id)
        .filter(|id| !shown.contains(id))
        .collect();

    TreeView {
        top,
        branches,
        hidden_ids,
        unreached: layout.unreached.clone(),
    }
}

fn nest<'a>(
    levels: &[Vec<Couple<'a>>],
    depth: usize,
    parent: &Couple<'a>,
    shown: &mut HashSet<Uuid>,
) -> Vec<Branch<'a>> {
    if depth >= 2 + NESTED_DEPTH {
        return Vec::new();
    }
    let Some(level) = levels.get(depth) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for couple in level {
        if shown.contains(&couple.member.id) || !parent.is_parent_of(couple.member) {
            continue;
        }
        shown.extend(couple.ids());
        let children = nest(levels, depth + 1, couple, shown);
        out.push(Branch { couple: couple.clone(), children });
    }
    out
}
