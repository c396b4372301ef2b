use serde::Serialize;
use uuid::Uuid;

use super::graph::FamilyGraph;
use crate::models::person::MoveDirection;

/// Every move shifts `display_order` by exactly this much.
pub const MOVE_STEP: i32 = 100;

/// Starting point of a move for a member without a `display_order`.
pub const MOVE_BASE_ORDER: i32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderChange {
    pub id: Uuid,
    pub display_order: i32,
}

fn shifted(current: Option<i32>, direction: MoveDirection) -> i32 {
    let base = current.unwrap_or(MOVE_BASE_ORDER);
    match direction {
        MoveDirection::Left => base.saturating_sub(MOVE_STEP),
        MoveDirection::Right => base.saturating_add(MOVE_STEP),
    }
}

/// Changes needed to move a member one step left or right. A recorded spouse
/// moves in lockstep. There is no lower or upper bound on the resulting values.
/// Returns `None` when the member is not in the graph.
pub fn plan_move(
    graph: &FamilyGraph<'_>,
    person_id: Uuid,
    direction: MoveDirection,
) -> Option<Vec<OrderChange>> {
    let person = graph.get(person_id)?;
    let mut changes = vec![OrderChange {
        id: person.id,
        display_order: shifted(person.display_order, direction),
    }];
    if let Some(spouse) = graph.spouse_of(person) {
        changes.push(OrderChange {
            id: spouse.id,
            display_order: shifted(spouse.display_order, direction),
        });
    }
    Some(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::person::fixtures::{id, person};

    #[test]
    fn test_move_unset_starts_from_base() {
        let members = vec![person(1, "A", "X")];
        let graph = FamilyGraph::new(&members);

        let left = plan_move(&graph, id(1), MoveDirection::Left).unwrap();
        assert_eq!(left, vec![OrderChange { id: id(1), display_order: 400 }]);

        let right = plan_move(&graph, id(1), MoveDirection::Right).unwrap();
        assert_eq!(right[0].display_order, 600);
    }

    #[test]
    fn test_move_shifts_spouse_in_lockstep() {
        let mut a = person(1, "A", "X");
        a.display_order = Some(1000);
        a.spouse_id = Some(id(2));
        let mut b = person(2, "B", "X");
        b.display_order = Some(1100);
        let members = vec![a, b];
        let graph = FamilyGraph::new(&members);

        let changes = plan_move(&graph, id(1), MoveDirection::Left).unwrap();
        assert_eq!(
            changes,
            vec![
                OrderChange { id: id(1), display_order: 900 },
                OrderChange { id: id(2), display_order: 1000 },
            ]
        );
    }

    #[test]
    fn test_move_goes_negative_without_clamping() {
        let mut a = person(1, "A", "X");
        a.display_order = Some(50);
        let members = vec![a];
        let graph = FamilyGraph::new(&members);

        let changes = plan_move(&graph, id(1), MoveDirection::Left).unwrap();
        assert_eq!(changes[0].display_order, -50);
    }

    #[test]
    fn test_move_unknown_member() {
        let members = vec![person(1, "A", "X")];
        let graph = FamilyGraph::new(&members);
        assert!(plan_move(&graph, id(9), MoveDirection::Right).is_none());
    }

    #[test]
    fn test_move_ignores_dangling_spouse() {
        let mut a = person(1, "A", "X");
        a.spouse_id = Some(id(404));
        let members = vec![a];
        let graph = FamilyGraph::new(&members);

        let changes = plan_move(&graph, id(1), MoveDirection::Right).unwrap();
        assert_eq!(changes.len(), 1);
    }
}
