use std::collections::HashSet;

use crate::error::{DbError, Result};

/// A child row of an integration edited as a whole list. An id of `0` marks a row that has not
/// been stored yet.
pub trait Identified {
    fn id(&self) -> i32;
}

/// What has to happen to the stored rows for them to equal the submitted list
#[derive(Debug, PartialEq, Eq)]
pub struct MergePlan<'a, T> {
    pub delete: Vec<i32>,
    pub update: Vec<&'a T>,
    pub insert: Vec<&'a T>,
}

/// Splits `items` into rows to update and insert, and lists the stored ids missing from
/// `items`.
///
/// A nonzero id that is not among `existing` belongs to some other parent (or nothing), and a
/// nonzero id submitted twice is ambiguous. Both are rejected.
pub fn plan<'a, T: Identified>(existing: &[i32], items: &'a [T]) -> Result<MergePlan<'a, T>> {
    let stored: HashSet<i32> = existing.iter().copied().collect();
    let mut kept = HashSet::with_capacity(items.len());
    let mut update = Vec::new();
    let mut insert = Vec::new();

    for item in items {
        match item.id() {
            0 => insert.push(item),
            id if !stored.contains(&id) => {
                return Err(DbError::InvalidInput(format!("unknown id {id}")));
            }
            id if !kept.insert(id) => {
                return Err(DbError::InvalidInput(format!("id {id} submitted twice")));
            }
            _ => update.push(item),
        }
    }

    let delete = existing
        .iter()
        .copied()
        .filter(|id| !kept.contains(id))
        .collect();
    Ok(MergePlan {
        delete,
        update,
        insert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Row(i32, &'static str);

    impl Identified for Row {
        fn id(&self) -> i32 {
            self.0
        }
    }

    #[test]
    fn splits_into_delete_update_insert() {
        let items = [Row(2, "kept"), Row(0, "new"), Row(0, "also new")];
        let plan = plan(&[1, 2, 3], &items).unwrap();

        assert_eq!(plan.delete, vec![1, 3]);
        assert_eq!(plan.update, vec![&Row(2, "kept")]);
        assert_eq!(plan.insert, vec![&Row(0, "new"), &Row(0, "also new")]);
    }

    #[test]
    fn empty_input_deletes_everything() {
        let plan = plan::<Row>(&[4, 5], &[]).unwrap();
        assert_eq!(plan.delete, vec![4, 5]);
        assert!(plan.update.is_empty());
        assert!(plan.insert.is_empty());
    }

    #[test]
    fn foreign_and_duplicate_ids_are_rejected() {
        assert!(matches!(
            plan(&[1], &[Row(9, "stolen")]),
            Err(DbError::InvalidInput(_))
        ));
        assert!(matches!(
            plan(&[1], &[Row(1, "a"), Row(1, "b")]),
            Err(DbError::InvalidInput(_))
        ));
    }
}
