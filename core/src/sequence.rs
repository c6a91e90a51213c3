//! Pure helpers computing a new ordered sequence from an old one.
//!
//! Callers use these to derive the next value handed to
//! [`OptimisticEngine::update`](crate::OptimisticEngine::update).
//! Items behind an `Arc` keep their pointer identity when a helper leaves them
//! untouched, so `Arc::ptr_eq` is a valid change check.

use std::sync::Arc;

/// An item with a unique identifier
pub trait Keyed {
    type Id: PartialEq + ?Sized;
    fn id(&self) -> &Self::Id;
}

/// An item carrying its own position
pub trait Ordered {
    fn order(&self) -> usize;
    fn set_order(&mut self, order: usize);
}

impl<T: Keyed> Keyed for Arc<T> {
    type Id = T::Id;
    fn id(&self) -> &T::Id { (**self).id() }
}

impl<T: Ordered + Clone> Ordered for Arc<T> {
    fn order(&self) -> usize { (**self).order() }
    fn set_order(&mut self, order: usize) { Arc::make_mut(self).set_order(order) }
}

/// Copy of `items` where the item with `id` has `apply` run against a fresh clone of it.
/// Every other item is the same `Arc`.
pub fn update_by_id<T>(items: &[Arc<T>], id: &T::Id, apply: impl FnOnce(&mut T)) -> Vec<Arc<T>>
where T: Keyed + Clone {
    let mut apply = Some(apply);
    items
        .iter()
        .map(|item| match apply.take_if(|_| item.id() == id) {
            Some(apply) => {
                let mut updated = T::clone(item);
                apply(&mut updated);
                Arc::new(updated)
            }
            None => item.clone(),
        })
        .collect()
}

/// Move the item at `from` to `to`, shifting the items in between.
///
/// A `to` past the end moves the item to the last position.
/// An out of range `from` returns `items` unchanged.
pub fn move_item<T>(mut items: Vec<T>, from: usize, to: usize) -> Vec<T> {
    if from >= items.len() {
        return items;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    items
}

/// `move_item` for the item with `id`. Returns `items` unchanged if no item has that id.
pub fn move_by_id<T: Keyed>(items: Vec<T>, id: &T::Id, to: usize) -> Vec<T> {
    match items.iter().position(|item| item.id() == id) {
        Some(from) => move_item(items, from, to),
        None => items,
    }
}

/// Overwrite each item's order with its position. Items already in place are left alone.
pub fn reindex<T: Ordered>(mut items: Vec<T>) -> Vec<T> {
    for (position, item) in items.iter_mut().enumerate() {
        if item.order() != position {
            item.set_order(position);
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Task {
        id: String,
        title: String,
        done: bool,
        order: usize,
    }

    impl Keyed for Task {
        type Id = str;
        fn id(&self) -> &str { &self.id }
    }

    impl Ordered for Task {
        fn order(&self) -> usize { self.order }
        fn set_order(&mut self, order: usize) { self.order = order }
    }

    fn task(id: &str, order: usize) -> Task { Task { id: id.to_string(), title: format!("task {id}"), done: false, order } }

    fn ids<T: Keyed<Id = str>>(items: &[T]) -> Vec<&str> { items.iter().map(|item| item.id()).collect() }

    #[test]
    fn test_update_by_id_shares_untouched_items() {
        let items: Vec<Arc<Task>> = vec![Arc::new(task("a", 0)), Arc::new(task("b", 1)), Arc::new(task("c", 2))];

        let updated = update_by_id(&items, "b", |task| task.done = true);

        assert!(Arc::ptr_eq(&items[0], &updated[0]));
        assert!(!Arc::ptr_eq(&items[1], &updated[1]));
        assert!(Arc::ptr_eq(&items[2], &updated[2]));
        assert!(updated[1].done);
        assert_eq!(updated[1].title, "task b");
        assert!(!items[1].done);
    }

    #[test]
    fn test_update_by_unknown_id() {
        let items = vec![Arc::new(task("a", 0))];
        let updated = update_by_id(&items, "zzz", |task| task.done = true);
        assert!(Arc::ptr_eq(&items[0], &updated[0]));
    }

    #[test]
    fn test_move_item() {
        let items = vec![task("a", 0), task("b", 1), task("c", 2), task("d", 3)];
        assert_eq!(ids(&move_item(items.clone(), 0, 2)), ["b", "c", "a", "d"]);
        assert_eq!(ids(&move_item(items.clone(), 3, 1)), ["a", "d", "b", "c"]);
        assert_eq!(ids(&move_item(items.clone(), 1, 1)), ["a", "b", "c", "d"]);
        assert_eq!(ids(&move_item(items.clone(), 1, 99)), ["a", "c", "d", "b"]);
        assert_eq!(ids(&move_item(items, 7, 0)), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_move_by_id() {
        let items = vec![task("a", 0), task("b", 1), task("c", 2)];
        assert_eq!(ids(&move_by_id(items.clone(), "b", 0)), ["b", "a", "c"]);
        assert_eq!(move_by_id(items.clone(), "missing", 0), items);
    }

    #[test]
    fn test_reindex() {
        let moved = move_by_id(vec![task("a", 0), task("b", 1), task("c", 2)], "c", 0);
        let reindexed = reindex(moved);
        let orders: Vec<(&str, usize)> = reindexed.iter().map(|task| (task.id.as_str(), task.order)).collect();
        assert_eq!(orders, [("c", 0), ("a", 1), ("b", 2)]);
    }

    #[test]
    fn test_reindex_keeps_arcs_in_place() {
        let items = vec![Arc::new(task("a", 0)), Arc::new(task("b", 5))];
        let first = items[0].clone();

        let reindexed = reindex(items);

        assert!(Arc::ptr_eq(&first, &reindexed[0]));
        assert_eq!(reindexed[1].order, 1);
    }
}
